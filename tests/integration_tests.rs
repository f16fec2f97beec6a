//! Integration tests for the genre feature pipeline

use std::path::{Path, PathBuf};
use std::sync::Arc;

use genre_dsp::cache::{FeatureCache, LocalObjectStore, MemoryObjectStore, ObjectStore};
use genre_dsp::config::{CredentialsProvider, StoreConfig};
use genre_dsp::dataset::{
    create_generators, stratified_split, BatchGenerator, BatchSource, DataIndex, DataIndexEntry,
    FeatureLoader, GeneratorOptions, GenreMap, Ingestor,
};
use genre_dsp::inference::{evaluate, Classifier, GenreModel, ModelHandle};
use genre_dsp::{
    open_loader, prepare_file, PipelineConfig, PipelineError, SpectrogramConfig, TensorShape,
};
use ndarray::{Array2, ArrayView4, Axis};
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write a mono 16-bit sine WAV
fn write_tone(path: &Path, freq: f32, sample_rate: u32, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create wav");
    let len = (sample_rate as f32 * seconds) as usize;
    for i in 0..len {
        let t = i as f32 / sample_rate as f32;
        let s = 0.5 * (2.0 * std::f32::consts::PI * freq * t).sin();
        writer
            .write_sample((s * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize wav");
}

/// Predicts class 8 (Rock) for loud inputs, class 0 otherwise
struct ThresholdModel;

impl GenreModel for ThresholdModel {
    fn predict(&self, inputs: ArrayView4<'_, f32>) -> genre_dsp::Result<Array2<f32>> {
        let n = inputs.len_of(Axis(0));
        let mut scores = Array2::<f32>::from_elem((n, 10), 0.01);
        for (i, item) in inputs.outer_iter().enumerate() {
            let mean = item.mean().unwrap_or(0.0);
            let class = if mean > 0.0 { 8 } else { 0 };
            scores[[i, class]] = 0.91;
        }
        Ok(scores)
    }
}

fn small_shape() -> TensorShape {
    TensorShape {
        height: 128,
        width: 64,
        channels: 1,
    }
}

fn generator_options(batch_size: usize, shuffle: bool) -> GeneratorOptions {
    GeneratorOptions {
        batch_size,
        shape: small_shape(),
        num_classes: 10,
        shuffle,
        seed: Some(42),
    }
}

struct Workspace {
    _dir: TempDir,
    music: PathBuf,
    store: Arc<MemoryObjectStore>,
    cache: FeatureCache,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().expect("tempdir");
    let music = dir.path().join("music");
    for (genre, freqs) in [("Rock", [110.0, 165.0]), ("Jazz", [440.0, 660.0])] {
        std::fs::create_dir_all(music.join(genre)).unwrap();
        for (i, freq) in freqs.iter().enumerate() {
            write_tone(&music.join(genre).join(format!("track{}.wav", i)), *freq, 22050, 0.5);
        }
    }
    let store = Arc::new(MemoryObjectStore::new());
    let cache = FeatureCache::new(dir.path().join("cache"), store.clone()).unwrap();
    Workspace {
        _dir: dir,
        music,
        store,
        cache,
    }
}

#[test]
fn test_ingest_then_train_batches() {
    init_logging();
    let ws = workspace();
    let genres = GenreMap::canonical();

    let mut ingestor = Ingestor::new(
        ws.cache.clone(),
        "aims3",
        "Spectrograms",
        SpectrogramConfig::default(),
        genres.clone(),
        Some(7),
    )
    .with_augmentation(true);
    let index = ingestor.ingest_directory(&ws.music).unwrap();
    assert_eq!(index.len(), 8);
    assert_eq!(ws.store.len(), 8);

    // the CSV round trip validates against the genre map
    let csv_path = ws.music.join("data_index.csv");
    index.save(&csv_path).unwrap();
    let index = DataIndex::load(&csv_path, &genres).unwrap();

    // fresh cache dir so every load goes to the store once
    let cold_cache = FeatureCache::new(ws.music.join("cold_cache"), ws.store.clone()).unwrap();
    let loader = FeatureLoader::new(cold_cache, SpectrogramConfig::default());
    let generator = BatchGenerator::new(index, loader, generator_options(3, true)).unwrap();

    assert_eq!(generator.len(), 3);
    let mut seen = 0;
    for i in 0..generator.len() {
        let batch = generator.get_batch(i).unwrap();
        assert!(batch.skipped.is_empty());
        assert_eq!(batch.inputs.dim().1, 128);
        assert_eq!(batch.inputs.dim().2, 64);
        seen += batch.len();
    }
    assert_eq!(seen, 8);
    assert_eq!(ws.store.fetch_count(), 8);

    // second pass is served from the local cache
    for i in 0..generator.len() {
        generator.get_batch(i).unwrap();
    }
    assert_eq!(ws.store.fetch_count(), 8);
}

#[test]
fn test_five_items_one_missing() {
    init_logging();
    let ws = workspace();
    let genres = GenreMap::canonical();
    let spectrogram = genre_dsp::Spectrogram::new(Array2::from_shape_fn((128, 40), |(r, c)| {
        -((r + c) as f32)
    }));

    let mut entries = Vec::new();
    for i in 0..5 {
        let key = format!("Spectrograms/Rock/{}_spectrogram.npy", i);
        if i != 2 {
            ws.cache.put("aims3", &key, &spectrogram).unwrap();
        }
        entries.push(DataIndexEntry::new(format!("store://aims3/{}", key), 8, &genres));
    }

    let cold_cache = FeatureCache::new(ws.music.join("cold"), ws.store.clone()).unwrap();
    let generator = BatchGenerator::new(
        DataIndex::new(entries),
        FeatureLoader::new(cold_cache, SpectrogramConfig::default()),
        generator_options(5, false),
    )
    .unwrap();

    let batch = generator.get_batch(0).unwrap();
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(
        batch.skipped[0].reference,
        "store://aims3/Spectrograms/Rock/2_spectrogram.npy"
    );
    for row in batch.labels.outer_iter() {
        assert_eq!(row[8], 1.0);
        assert_eq!(row.sum(), 1.0);
    }
}

#[test]
fn test_single_missing_item_is_empty_batch() {
    init_logging();
    let ws = workspace();
    let genres = GenreMap::canonical();
    let index = DataIndex::new(vec![DataIndexEntry::new(
        "store://aims3/nowhere.npy",
        3,
        &genres,
    )]);
    let generator = BatchGenerator::new(
        index,
        FeatureLoader::new(ws.cache.clone(), SpectrogramConfig::default()),
        generator_options(1, false),
    )
    .unwrap();

    let err = generator.get_batch(0).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyBatch { batch_index: 0 }));
    assert_eq!(err.to_string(), "No data available for batch 0");
}

#[test]
fn test_local_audio_references() {
    init_logging();
    let ws = workspace();
    let genres = GenreMap::canonical();

    let tracks = [
        "Rock/track0.wav",
        "Rock/track1.wav",
        "Jazz/track0.wav",
        "Jazz/track1.wav",
    ];
    let references: Vec<String> = tracks
        .iter()
        .map(|p| ws.music.join(p).to_string_lossy().into_owned())
        .collect();
    let index = DataIndex::from_references(&references, &genres);
    assert_eq!(index.len(), 4);
    assert_eq!(index.class_distribution().get(&4), Some(&2));

    let (train, validation) = stratified_split(&index, 0.5, 42).unwrap();
    assert_eq!(train.len(), 2);
    assert_eq!(validation.len(), 2);

    let loader = FeatureLoader::new(ws.cache.clone(), SpectrogramConfig::default());
    let (train_gen, val_gen) =
        create_generators(train, validation, loader, generator_options(2, false)).unwrap();

    let val_batch = val_gen.get_batch(0).unwrap();
    assert_eq!(val_batch.len(), 2);
    assert_eq!(val_gen.get_batch(0).unwrap().references, val_batch.references);
    assert_eq!(train_gen.get_batch(0).unwrap().len(), 2);

    // every audio file was extracted once and cached
    let cached = std::fs::read_dir(ws.cache.dir()).unwrap().count();
    assert_eq!(cached, 4);
    assert_eq!(ws.store.fetch_count(), 0);
}

#[test]
fn test_classifier_and_evaluation() {
    init_logging();
    let ws = workspace();
    let config = PipelineConfig {
        tensor: small_shape(),
        ..PipelineConfig::default()
    };
    let classifier = Classifier::new(
        ModelHandle::Ready(Arc::new(ThresholdModel)),
        Arc::new(GenreMap::canonical()),
        &config,
    );

    let predictions = classifier
        .classify_file(&ws.music.join("Rock/track0.wav"))
        .unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0].name, "Rock");
    assert_eq!(predictions[0].confidence, 91.0);
    assert!(predictions[1].confidence <= predictions[0].confidence);
    assert!(predictions[2].confidence <= predictions[1].confidence);

    let tensor = prepare_file(&ws.music.join("Jazz/track1.wav"), &config).unwrap();
    assert_eq!(tensor.dim(), (128, 64, 1));

    let genres = GenreMap::canonical();
    let references: Vec<String> = ["Rock/track0.wav", "Rock/track1.wav"]
        .iter()
        .map(|p| ws.music.join(p).to_string_lossy().into_owned())
        .collect();
    let generator = BatchGenerator::new(
        DataIndex::from_references(&references, &genres),
        FeatureLoader::new(ws.cache.clone(), SpectrogramConfig::default()),
        generator_options(2, false),
    )
    .unwrap();
    let report = evaluate(&ThresholdModel, &generator, 10).unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.accuracy, 1.0);
    assert_eq!(report.per_class[8].support, 2);
}

#[test]
fn test_unloaded_model_reports_not_ready() {
    let classifier = Classifier::new(
        ModelHandle::Unavailable("checkpoint missing".to_string()),
        Arc::new(GenreMap::canonical()),
        &PipelineConfig::default(),
    );
    let err = classifier.classify_samples(&[0.1; 22050], 22050).unwrap_err();
    assert!(matches!(err, PipelineError::ModelNotReady(_)));
}

#[test]
fn test_config_file_to_loader() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    let config_path = dir.path().join("pipeline.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
batch_size = 4
cache_dir = "{cache}"

[tensor]
width = 64

[store]
bucket = "aims3"
region = "us-east-2"
root = "{mirror}"
credentials = {{ provider = "anonymous" }}
"#,
            cache = dir.path().join("cache").display(),
            mirror = mirror.display(),
        ),
    )
    .unwrap();

    let config = PipelineConfig::load(&config_path).unwrap();
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.tensor.width, 64);

    // seed the mirror through the store interface
    let store = LocalObjectStore::new(&mirror);
    let spectrogram = genre_dsp::Spectrogram::new(Array2::from_elem((128, 10), -3.0));
    let body = genre_dsp::cache::codec::encode_spectrogram(&spectrogram).unwrap();
    store.put("aims3", "Pop/x_spectrogram.npy", &body).unwrap();

    let loader = open_loader(&config).unwrap();
    let generator = BatchGenerator::new(
        DataIndex::from_references(["s3://aims3/Pop/x_spectrogram.npy"], &GenreMap::canonical()),
        loader,
        GeneratorOptions {
            batch_size: config.batch_size,
            shape: config.tensor,
            num_classes: 10,
            shuffle: false,
            seed: config.seed,
        },
    )
    .unwrap();
    let batch = generator.get_batch(0).unwrap();
    assert_eq!(batch.references, vec!["store://aims3/Pop/x_spectrogram.npy".to_string()]);
    assert_eq!(batch.class_of(0), Some(5));
    // constant spectrogram normalizes to zeros
    assert!(batch.inputs.iter().all(|&v| v == 0.0));
}

#[test]
fn test_incomplete_credentials_fail_fast() {
    let config = StoreConfig {
        bucket: "aims3".to_string(),
        region: "us-east-2".to_string(),
        credentials: CredentialsProvider::Static {
            access_key_id: String::new(),
            secret_access_key: "secret".to_string(),
        },
        root: None,
    };
    assert!(matches!(
        genre_dsp::cache::open_store(&config),
        Err(PipelineError::ConfigError(_))
    ));
}
