use anyhow::{Context, Result};
use shopdesk_infrastructure::TomlSettingsRepository;

pub fn init(settings: &TomlSettingsRepository, force: bool) -> Result<()> {
    let written = settings
        .init_template(force)
        .with_context(|| format!("Failed to write {}", settings.path().display()))?;
    if written {
        println!("Wrote {}", settings.path().display());
    } else {
        println!("{} already exists (use --force to overwrite)", settings.path().display());
    }
    Ok(())
}

pub fn path(settings: &TomlSettingsRepository) {
    println!("{}", settings.path().display());
}
