#[cfg(target_os = "macos")]
pub mod macos;

pub mod test;
