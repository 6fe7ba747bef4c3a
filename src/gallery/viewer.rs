/// Full-screen single photo viewer with two-step delete
///
/// The confirmation state belongs to one viewer session: every way out of
/// the viewer (close, opening another photo, a finished delete) resets it.
use chrono::Local;

use crate::state::{Photo, PhotoId};

/// Hint shown while a delete is armed
pub const CONFIRM_HINT: &str = "Tap delete again to confirm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteConfirm {
    #[default]
    Viewing,
    ConfirmArmed,
    /// Second press seen, delete in flight
    Executed,
}

/// What a press of the delete button asks the caller to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePress {
    /// First press: show the confirmation hint
    Armed,
    /// Second press: delete this photo now
    Execute(PhotoId),
    /// No photo open, or a delete is already running
    Ignored,
}

#[derive(Debug, Default)]
pub struct PhotoViewer {
    photo: Option<Photo>,
    confirm: DeleteConfirm,
}

impl PhotoViewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a photo. Always starts a fresh session in `Viewing`.
    pub fn open(&mut self, photo: Photo) {
        self.photo = Some(photo);
        self.confirm = DeleteConfirm::Viewing;
    }

    pub fn close(&mut self) {
        self.photo = None;
        self.confirm = DeleteConfirm::Viewing;
    }

    pub fn is_open(&self) -> bool {
        self.photo.is_some()
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn confirm(&self) -> DeleteConfirm {
        self.confirm
    }

    pub fn press_delete(&mut self) -> DeletePress {
        let Some(photo) = &self.photo else {
            return DeletePress::Ignored;
        };

        match self.confirm {
            DeleteConfirm::Viewing => {
                self.confirm = DeleteConfirm::ConfirmArmed;
                DeletePress::Armed
            }
            DeleteConfirm::ConfirmArmed => {
                self.confirm = DeleteConfirm::Executed;
                DeletePress::Execute(photo.id.clone())
            }
            DeleteConfirm::Executed => DeletePress::Ignored,
        }
    }

    /// Report the result of an `Execute`. Success closes the viewer;
    /// failure keeps the photo open, disarmed, so the user can retry.
    pub fn finish_delete(&mut self, deleted: bool) {
        if self.confirm != DeleteConfirm::Executed {
            return;
        }
        if deleted {
            self.close();
        } else {
            self.confirm = DeleteConfirm::Viewing;
        }
    }

    pub fn details(&self) -> Option<PhotoDetails> {
        self.photo
            .as_ref()
            .map(|photo| PhotoDetails::new(photo, self.confirm == DeleteConfirm::ConfirmArmed))
    }
}

/// Metadata lines shown under the full-size image
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoDetails {
    pub kind_label: &'static str,
    pub captured_at: String,
    pub gps: Option<String>,
    pub notes: Option<String>,
    pub confirm_hint: Option<&'static str>,
}

impl PhotoDetails {
    fn new(photo: &Photo, armed: bool) -> Self {
        Self {
            kind_label: photo.kind.label(),
            captured_at: photo
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            gps: photo
                .coordinates()
                .map(|c| format!("GPS: {:.6}, {:.6}", c.latitude, c.longitude)),
            notes: photo.notes.clone().filter(|n| !n.is_empty()),
            confirm_hint: armed.then_some(CONFIRM_HINT),
        }
    }
}
