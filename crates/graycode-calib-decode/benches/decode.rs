use criterion::{black_box, criterion_group, criterion_main, Criterion};
use graycode_calib_core::GrayImage;
use graycode_calib_decode::{DecodeParams, GrayCodeDecoder, GrayCodePattern, Mask, ProjectorSize};

fn magnify(frame: &GrayImage, scale: usize) -> GrayImage {
    GrayImage::from_fn(frame.width * scale, frame.height * scale, |x, y| {
        frame.data[(y / scale) * frame.width + x / scale]
    })
}

fn bench_decode(c: &mut Criterion) {
    let size = ProjectorSize::new(320, 180);
    let frames: Vec<GrayImage> = GrayCodePattern::new(size)
        .expect("pattern")
        .frames()
        .iter()
        .map(|f| magnify(f, 2))
        .collect();
    let views: Vec<_> = frames.iter().map(|f| f.view()).collect();
    let mask = Mask::full(frames[0].width, frames[0].height);
    let decoder = GrayCodeDecoder::new(DecodeParams::default());

    c.bench_function("decode_640x360_camera", |b| {
        b.iter(|| {
            let pairs = decoder
                .decode(black_box(&views[2..]), &mask, size)
                .expect("decode");
            black_box(pairs.len())
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
