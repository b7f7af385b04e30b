use crate::allocator::BitmapAllocator;
use crate::config::Config;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// A started pool together with the name it was configured under
#[derive(Debug)]
pub struct NamedPool {
    pub name: String,
    pub allocator: BitmapAllocator,
}

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path).wrap_err_with(|| {
        format!(
            "Failed to open configuration file '{}'",
            config_path.display()
        )
    })?;

    let config: Config = serde_yaml::from_reader(file).wrap_err_with(|| {
        format!(
            "Failed to parse configuration file '{}'",
            config_path.display()
        )
    })?;

    config.validate()?;
    info!("Loaded {} pool definition(s)", config.pools.len());

    Ok(config)
}

/// Start an allocator for every configured pool, in file order
pub fn build_pools(config: &Config) -> Result<Vec<NamedPool>> {
    config
        .pools
        .iter()
        .map(|pool| {
            let allocator = pool.build(&config.general)?;
            info!("Started pool '{}' covering {}", pool.name, allocator.range());
            Ok(NamedPool {
                name: pool.name.clone(),
                allocator,
            })
        })
        .collect()
}
