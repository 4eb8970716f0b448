//! Site context switching
//!
//! On a network, email commands act on one site at a time. The active
//! site lives in a [`SiteContext`] that is passed to the code that needs
//! it; [`SiteContext::switch`] hands out a guard that puts the previous
//! site back when it goes out of scope, whichever way the scope is left.

use super::SiteId;

/// The site a command is currently acting on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteContext {
    primary: SiteId,
    current: SiteId,
}

impl SiteContext {
    /// Starts on the primary site
    pub fn new(primary: SiteId) -> Self {
        Self {
            primary,
            current: primary,
        }
    }

    pub fn primary(&self) -> SiteId {
        self.primary
    }

    pub fn current(&self) -> SiteId {
        self.current
    }

    pub fn is_primary(&self) -> bool {
        self.current == self.primary
    }

    /// Makes `site` current until the returned guard is dropped
    pub fn switch(&mut self, site: SiteId) -> SiteSwitch<'_> {
        let previous = self.current;
        self.current = site;
        SiteSwitch {
            context: self,
            previous,
        }
    }
}

/// Restores the previous site on drop
#[derive(Debug)]
pub struct SiteSwitch<'a> {
    context: &'a mut SiteContext,
    previous: SiteId,
}

impl SiteSwitch<'_> {
    /// The site in effect while the guard lives
    pub fn site(&self) -> SiteId {
        self.context.current
    }

    /// The site that will be restored
    pub fn previous(&self) -> SiteId {
        self.previous
    }

    /// True if the switch actually changed site
    pub fn switched(&self) -> bool {
        self.context.current != self.previous
    }
}

impl Drop for SiteSwitch<'_> {
    fn drop(&mut self) {
        self.context.current = self.previous;
    }
}
