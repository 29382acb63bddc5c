use crate::{browser::driver::{Driver, ElementHandle}, error::Result};

/// Scoped entry into an iframe
///
/// The session's current frame is shared mutable state. Entering a frame
/// through a guard switches back to the parent frame when the guard drops,
/// on every exit path.
pub struct FrameGuard<'a, D: Driver + ?Sized> {
    driver: &'a D,
    active: bool,
}

impl<'a, D: Driver + ?Sized> FrameGuard<'a, D> {
    /// Switch into `frame`, returning a guard that restores the parent frame
    pub fn enter(driver: &'a D, frame: &ElementHandle) -> Result<Self> {
        driver.switch_to_frame(frame)?;
        Ok(Self { driver, active: true })
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    /// Restore the parent frame now and report failure to the caller
    pub fn exit(mut self) -> Result<()> {
        self.active = false;
        self.driver.switch_to_parent_frame()
    }
}

impl<D: Driver + ?Sized> Drop for FrameGuard<'_, D> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.driver.switch_to_parent_frame() {
                log::warn!("Failed to restore parent frame: {}", e);
            }
        }
    }
}
