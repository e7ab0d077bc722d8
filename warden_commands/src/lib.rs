mod prelude;

mod echo;
mod note;
mod ping;
mod roll;
mod tag;

use warden_framework::CommandSetBuilder;

/// Registers every feature component with the explicitly-constructed
/// registry. Components only ever see the builder passed to them here.
pub fn register_all(set: &mut CommandSetBuilder) -> anyhow::Result<()> {
    ping::setup(set)?;
    echo::setup(set)?;
    roll::setup(set)?;
    tag::setup(set)?;
    note::setup(set)?;

    Ok(())
}
