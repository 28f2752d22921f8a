use anyhow::Context;
use began_dataset::{store, ImageTensor};
use models::BeganConfig;
use tracing::info;

use crate::config::TrainConfig;

/// Load the configured dataset, building it first when the container file
/// does not exist yet.
pub fn prepare_dataset(cfg: &TrainConfig) -> anyhow::Result<ImageTensor> {
    let section = &cfg.dataset;
    if !store::exists(&section.data_dir, &section.name) {
        info!(
            "dataset {} not found in {}; building it",
            section.name,
            section.data_dir.display()
        );
        began_dataset::build(&section.name, &cfg.build_options())
            .with_context(|| format!("failed to build dataset {}", section.name))?;
    }
    let data = began_dataset::load(&section.data_dir, &section.name)
        .with_context(|| format!("failed to load dataset {}", section.name))?;
    check_compatible(&data, &cfg.model)?;
    info!(
        "loaded {} images at {}x{} from {}",
        data.count(),
        data.resolution(),
        data.resolution(),
        store::dataset_path(&section.data_dir, &section.name).display()
    );
    Ok(data)
}

/// The model consumes square RGB images at exactly its configured size.
pub fn check_compatible(data: &ImageTensor, model: &BeganConfig) -> anyhow::Result<()> {
    if data.channels() != 3 {
        anyhow::bail!("dataset has {} channels; expected 3", data.channels());
    }
    if data.resolution() != model.image_size {
        anyhow::bail!(
            "dataset resolution {} does not match model image_size {}",
            data.resolution(),
            model.image_size
        );
    }
    Ok(())
}
