/// Receives human readable status lines while long operations run
pub trait Reporter: Send + Sync {
    fn status(&self, message: &str);
}

/// Reporter that drops every message
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Reporter for Silent {
    fn status(&self, _message: &str) {}
}
