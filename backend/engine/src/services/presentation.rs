use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;

/// Control of the exclusive fullscreen presentation mode. Entering is a
/// user-mediated permission and may be refused.
#[async_trait]
pub trait PresentationControl: Send + Sync {
    async fn enter_fullscreen(&self) -> Result<()>;
    async fn exit_fullscreen(&self) -> Result<()>;
    fn is_fullscreen(&self) -> bool;
}

/// Presentation control for tests and headless embedders: grants fullscreen
/// unconditionally unless told to refuse.
#[derive(Default)]
pub struct HeadlessPresentation {
    fullscreen: AtomicBool,
    deny_requests: AtomicBool,
}

impl HeadlessPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_deny_requests(&self, deny: bool) {
        self.deny_requests.store(deny, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresentationControl for HeadlessPresentation {
    async fn enter_fullscreen(&self) -> Result<()> {
        if self.deny_requests.load(Ordering::SeqCst) {
            bail!("fullscreen request dismissed");
        }
        self.fullscreen.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exit_fullscreen(&self) -> Result<()> {
        self.fullscreen.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }
}
