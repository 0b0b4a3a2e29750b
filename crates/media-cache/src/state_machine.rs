use std::path::PathBuf;

use media_platform::MediaError;

/// Cache lifecycle of a single attachment view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttachmentCacheState {
    /// Nothing checked yet.
    #[default]
    Unchecked,
    /// Looking up the local cache.
    Checking,
    /// File available locally.
    Cached(PathBuf),
    /// A transfer is running; `owner` is false when this view only observes
    /// a download started elsewhere.
    Downloading { owner: bool },
    /// Not cached and not downloading; tapping starts a download.
    Failed,
    /// The user cancelled the transfer.
    Cancelled,
}

impl AttachmentCacheState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Downloading { .. })
    }

    pub fn cached_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Cached(path) => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentStateMachine {
    state: AttachmentCacheState,
}

impl AttachmentStateMachine {
    pub fn state(&self) -> &AttachmentCacheState {
        &self.state
    }

    pub fn begin_check(&mut self) -> Result<(), MediaError> {
        if self.state != AttachmentCacheState::Unchecked {
            return Err(MediaError::invalid_state(&self.state, "begin_check"));
        }
        self.state = AttachmentCacheState::Checking;
        Ok(())
    }

    pub fn on_cached(&mut self, path: PathBuf) -> Result<(), MediaError> {
        match self.state {
            AttachmentCacheState::Checking | AttachmentCacheState::Downloading { .. } => {
                self.state = AttachmentCacheState::Cached(path);
                Ok(())
            }
            _ => Err(MediaError::invalid_state(&self.state, "on_cached")),
        }
    }

    /// Enter `Downloading`, either as the owner of a new transfer or as an
    /// observer of one already in flight.
    pub fn begin_download(&mut self, owner: bool) -> Result<(), MediaError> {
        match self.state {
            AttachmentCacheState::Checking
            | AttachmentCacheState::Failed
            | AttachmentCacheState::Cancelled => {
                self.state = AttachmentCacheState::Downloading { owner };
                Ok(())
            }
            _ => Err(MediaError::invalid_state(&self.state, "begin_download")),
        }
    }

    pub fn on_failed(&mut self) -> Result<(), MediaError> {
        match self.state {
            AttachmentCacheState::Checking | AttachmentCacheState::Downloading { .. } => {
                self.state = AttachmentCacheState::Failed;
                Ok(())
            }
            _ => Err(MediaError::invalid_state(&self.state, "on_failed")),
        }
    }

    pub fn on_cancelled(&mut self) -> Result<(), MediaError> {
        if !self.state.is_loading() {
            return Err(MediaError::invalid_state(&self.state, "on_cancelled"));
        }
        self.state = AttachmentCacheState::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_download_path_transitions() {
        let mut sm = AttachmentStateMachine::default();

        sm.begin_check().expect("check must start from unchecked");
        assert_eq!(sm.state(), &AttachmentCacheState::Checking);

        sm.begin_download(true).expect("download should start");
        assert!(sm.state().is_loading());

        sm.on_cached(PathBuf::from("/cache/a.png"))
            .expect("download should complete");
        assert_eq!(
            sm.state().cached_path(),
            Some(&PathBuf::from("/cache/a.png"))
        );
    }

    #[test]
    fn retries_after_cancel_or_failure() {
        let mut sm = AttachmentStateMachine::default();
        sm.begin_check().expect("check");
        sm.on_failed().expect("idle after check");
        sm.begin_download(true).expect("tap starts download");
        sm.on_cancelled().expect("tap cancels download");
        assert_eq!(sm.state(), &AttachmentCacheState::Cancelled);
        sm.begin_download(false).expect("tap restarts download");
        assert_eq!(sm.state(), &AttachmentCacheState::Downloading { owner: false });
    }

    #[test]
    fn rejects_download_once_cached() {
        let mut sm = AttachmentStateMachine::default();
        sm.begin_check().expect("check");
        sm.on_cached(PathBuf::from("/cache/a.png")).expect("cached");

        let err = sm
            .begin_download(true)
            .expect_err("cached attachments never download");
        assert_eq!(err.code, "invalid_state_transition");
        sm.begin_check()
            .expect_err("check only runs once per view");
    }
}
