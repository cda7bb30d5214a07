#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Interrupted by a pending fatal signal while waiting for the region map lock")]
    Interrupted,

    #[error("A word table has already been installed")]
    WordsAlreadyInstalled,

    #[error("Region [{start:#x}, {end:#x}) overlaps an existing region")]
    RegionOverlap { start: u64, end: u64 },

    #[error("Region [{start:#x}, {end:#x}) is empty or inverted")]
    InvalidRange { start: u64, end: u64 },

    #[error("Failed to read procfs info: {0}")]
    Procfs(#[from] procfs::ProcError),
}
