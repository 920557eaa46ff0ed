use anyhow::Result;
use shopdesk_core::schedule::select_mode;
use shopdesk_infrastructure::TomlSettingsRepository;

use super::{AT_FORMAT, resolve_at};

pub fn show(settings: &TomlSettingsRepository, at: Option<&str>) -> Result<()> {
    let config = settings.load()?;
    let now = resolve_at(at)?;
    let mode = select_mode(now, &config.schedule);
    println!("{}  {}", now.format(AT_FORMAT), mode);
    if mode.is_automated() {
        println!("automated replies: on ({:?})", config.reply.source);
    } else {
        println!("automated replies: off");
    }
    Ok(())
}
