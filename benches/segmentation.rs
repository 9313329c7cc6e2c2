//! Benchmarks for text segmentation
//!
//! This benchmark measures:
//! - Sentence-aware bounded splitting across segment sizes
//! - Paragraph grouping
//! - WAV sample conversion of a generated segment

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tts_relay::audio::{pcm_to_samples, samples_to_pcm};
use tts_relay::segment::TextSegmenter;

fn sample_script(paragraphs: usize) -> String {
    let paragraph = "Pada suatu pagi yang cerah, seorang pengembara tiba di desa kecil. \
        Ia membawa sebuah peta tua yang penuh coretan! Apakah peta itu masih berguna? \
        Penduduk desa berkumpul untuk mendengar ceritanya, dan malam pun tiba tanpa terasa.";
    (0..paragraphs)
        .map(|_| paragraph)
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_bounded(c: &mut Criterion) {
    let text = sample_script(400);
    let mut group = c.benchmark_group("segment_bounded");
    group.throughput(Throughput::Bytes(text.len() as u64));

    for max_chars in [500usize, 1_500, 4_800] {
        let segmenter = TextSegmenter::new(max_chars).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(max_chars), &text, |b, text| {
            b.iter(|| segmenter.segment(black_box(text)))
        });
    }
    group.finish();
}

fn bench_paragraphs(c: &mut Criterion) {
    let text = sample_script(400);
    let segmenter = TextSegmenter::paragraphs(5).unwrap();
    c.bench_function("segment_paragraphs", |b| {
        b.iter(|| segmenter.segment(black_box(&text)))
    });
}

fn bench_pcm_conversion(c: &mut Criterion) {
    // ten seconds of 24 kHz mono
    let pcm = samples_to_pcm(&vec![1_234i16; 240_000]);
    let mut group = c.benchmark_group("pcm");
    group.throughput(Throughput::Bytes(pcm.len() as u64));
    group.bench_function("to_samples", |b| b.iter(|| pcm_to_samples(black_box(&pcm))));
    group.finish();
}

criterion_group!(benches, bench_bounded, bench_paragraphs, bench_pcm_conversion);
criterion_main!(benches);
