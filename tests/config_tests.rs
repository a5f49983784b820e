//! Building models from TOML experiment configs.
//!
//! Run with:
//! ```bash
//! cargo test -p ddspice --test config_tests
//! ```

mod helpers;

use burn::backend::ndarray::NdArrayDevice;
use ddspice::core::Error as CoreError;
use ddspice::model::Error as ModelError;
use ddspice::prelude::*;
use ddspice::{ConsistencyTarget, PITCH_CONSISTENCY_LOSS, TOTAL_LOSS};
use helpers::*;
use std::io::Write;

type B = CpuBackend;

const PLAIN: &str = r#"
[data]
example_secs = 1
sample_rate = 8000
frame_rate = 500

[model]
type = "autoencoder"
decoder = { type = "linear" }
processor_group = { type = "hold", hop = 16 }

[[model.losses]]
type = "waveform_l1"

[[model.losses]]
type = "waveform_l2"
name = "spectral_stand_in"
weight = 0.5
"#;

const DDSPICE: &str = r#"
[data]
example_secs = 1
sample_rate = 8000
frame_rate = 125

[augmentation]
max_shift_steps = 4
seed = 3

[model]
type = "autoencoder_ddspice"
decoder = { type = "linear" }
processor_group = { type = "hold", hop = 64 }
pitch_estimator = { type = "crepe", capacity = 4, window = 256 }

[model.consistency]
target = "semitone_delta"
huber_delta = 2.0
"#;

#[test]
fn test_plain_autoencoder_from_toml() {
    let device = NdArrayDevice::default();
    let config = ExperimentConfig::from_toml_str(PLAIN).unwrap();
    assert_eq!(config.data.hop_length(), TEST_HOP);

    let model = test_registry::<B>().get_model(&config, &device).unwrap();
    assert_eq!(model.name(), "autoencoder");
    assert!(!model.is_consistent());
    assert_eq!(
        model.loss_names(),
        vec!["waveform_l1_loss", "spectral_stand_in", TOTAL_LOSS]
    );

    let features = sine_features::<B>(&[440.0], 8, TEST_HOP, &device);
    let output = model.call(&features, true).unwrap();
    assert_eq!(output.audio.dims(), [1, 8 * TEST_HOP]);
}

#[test]
fn test_ddspice_from_toml() {
    let device = NdArrayDevice::default();
    let config = ExperimentConfig::from_toml_str(DDSPICE).unwrap();
    let spec = config.model().unwrap();
    assert_eq!(spec.kind, ModelKind::AutoencoderDdspice);
    assert_eq!(spec.consistency.target, ConsistencyTarget::SemitoneDelta);
    assert_eq!(config.augmentation.max_shift_steps, 4);

    let model = test_registry::<B>().get_model(&config, &device).unwrap();
    assert_eq!(model.name(), "autoencoder_ddspice");
    assert!(model.is_consistent());
    assert_eq!(
        model.loss_names(),
        vec![PITCH_CONSISTENCY_LOSS, TOTAL_LOSS]
    );
}

#[test]
fn test_load_from_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DDSPICE.as_bytes()).unwrap();

    let config = ExperimentConfig::load(file.path()).unwrap();
    assert_eq!(config, ExperimentConfig::from_toml_str(DDSPICE).unwrap());
}

#[test]
fn test_missing_model_section() {
    let device = NdArrayDevice::default();
    let config = ExperimentConfig::from_toml_str("[data]\nexample_secs = 1\n").unwrap();

    let result = test_registry::<B>().get_model(&config, &device);
    assert!(matches!(
        result,
        Err(ModelError::Core(CoreError::MissingArgument(ref what))) if what == "model"
    ));
}

#[test]
fn test_unknown_decoder_type() {
    let device = NdArrayDevice::default();
    let config =
        ExperimentConfig::from_toml_str(&PLAIN.replace("\"linear\"", "\"transformer\"")).unwrap();

    let result = test_registry::<B>().get_model(&config, &device);
    assert!(matches!(
        result,
        Err(ModelError::Core(CoreError::UnknownComponent { ref name, .. })) if name == "transformer"
    ));
}

#[test]
fn test_invalid_data_section_rejected() {
    let result = ExperimentConfig::from_toml_str("[data]\nsample_rate = 16000\nframe_rate = 333\n");
    assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
}

#[test]
fn test_invalid_shift_range_rejected() {
    let toml = DDSPICE.replace("max_shift_steps = 4", "max_shift_steps = 100");
    assert!(matches!(
        ExperimentConfig::from_toml_str(&toml),
        Err(CoreError::InvalidConfig(_))
    ));
}

fn build(toml: &str, device: &NdArrayDevice) -> ddspice::Result<Autoencoder<B>> {
    let config = ExperimentConfig::from_toml_str(toml)?;
    Ok(test_registry::<B>().get_model(&config, device)?)
}

#[test]
fn test_umbrella_error_wraps_each_layer() {
    let device = NdArrayDevice::default();
    assert!(build(PLAIN, &device).is_ok());

    let invalid = PLAIN.replace("frame_rate = 500", "frame_rate = 0");
    assert!(matches!(
        build(&invalid, &device),
        Err(ddspice::Error::Core(CoreError::InvalidConfig(_)))
    ));

    let no_group = PLAIN.replace("processor_group = { type = \"hold\", hop = 16 }", "");
    assert!(matches!(
        build(&no_group, &device),
        Err(ddspice::Error::Model(ModelError::Core(CoreError::MissingArgument(_))))
    ));
}
