use chrono::Local;
use iced::widget::image::Handle;
use iced::widget::{button, column, container, row, scrollable, text, Column, Row};
use iced::{Alignment, Element, Length, Task, Theme};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crew_photos::capture::{
    CaptureCoordinator, CaptureOutcome, CaptureRequest, ConfiguredLocation, FilePickerSource,
};
use crew_photos::config::Config;
use crew_photos::gallery::{DeletePress, GalleryPresenter, GalleryState, GalleryView};
use crew_photos::state::{export, CustomerId, JobId, Photo, PhotoId, PhotoKind, PhotoStore};

type Coordinator = CaptureCoordinator<FilePickerSource, ConfiguredLocation>;
type Gallery = GalleryPresenter<FilePickerSource, ConfiguredLocation>;

const THUMBNAIL_WIDTH: f32 = 200.0;
const GRID_COLUMNS: usize = 3;

/// Command line: `crew-photos --job <id> --customer <id>` or `crew-photos export <file>`
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Gallery { job_id: JobId, customer_id: CustomerId },
    Export(PathBuf),
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut job_id = None;
        let mut customer_id = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "export" => {
                    let path = args.next().ok_or("export needs a file path")?;
                    return Ok(Command::Export(PathBuf::from(path)));
                }
                "--job" => job_id = Some(parse_id(args.next(), "--job")?),
                "--customer" => customer_id = Some(parse_id(args.next(), "--customer")?),
                other => return Err(format!("unknown argument '{}'", other)),
            }
        }

        match (job_id, customer_id) {
            (Some(job_id), Some(customer_id)) => Ok(Command::Gallery {
                job_id,
                customer_id,
            }),
            _ => Err("usage: crew-photos --job <id> --customer <id> | crew-photos export <file>".into()),
        }
    }
}

fn parse_id(value: Option<String>, flag: &str) -> Result<i64, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}

/// The photo section is either usable, still opening, or hidden
enum Feature {
    Opening,
    Unavailable(String),
    Ready {
        coordinator: Arc<Coordinator>,
        gallery: Gallery,
        capturing: bool,
        handles: HashMap<PhotoId, Handle>,
    },
}

/// Main application state
struct CrewPhotos {
    job_id: JobId,
    customer_id: CustomerId,
    /// Built during startup, moved into `Feature::Ready` once the store opens
    pending: Option<Arc<Coordinator>>,
    feature: Feature,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    StoreOpened(Result<(), String>),
    PhotosLoaded(Result<usize, String>),
    Capture(PhotoKind),
    Captured(Result<CaptureOutcome, String>),
    Open(PhotoId),
    CloseViewer,
    DeletePressed,
    Deleted(Result<(), String>),
}

impl CrewPhotos {
    fn new(job_id: JobId, customer_id: CustomerId, config: Config) -> (Self, Task<Message>) {
        let store = Arc::new(config.photo_store());
        let coordinator = Arc::new(
            CaptureCoordinator::new(
                store.clone(),
                FilePickerSource::default(),
                ConfiguredLocation::from_config(config.fixed_location),
            )
            .with_location_timeout(config.location_timeout()),
        );

        let app = CrewPhotos {
            job_id,
            customer_id,
            pending: Some(coordinator),
            feature: Feature::Opening,
            status: format!("Opening photos for job #{}...", job_id),
        };

        let open = Task::perform(
            async move {
                store.open().await.map_err(|e| e.to_string())?;
                let count = store.count().await.map_err(|e| e.to_string())?;
                tracing::info!("🎨 Crew Photos initialized with {} photos", count);
                Ok::<(), String>(())
            },
            Message::StoreOpened,
        );

        (app, open)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::StoreOpened(Ok(())) => {
                let Some(coordinator) = self.pending.take() else {
                    return Task::none();
                };
                let mut gallery = GalleryPresenter::new(coordinator.clone());
                gallery.watch(self.job_id);
                self.feature = Feature::Ready {
                    coordinator: coordinator.clone(),
                    gallery,
                    capturing: false,
                    handles: HashMap::new(),
                };
                self.status = "Ready.".into();
                self.reload(coordinator)
            }
            Message::StoreOpened(Err(reason)) => {
                // The rest of the job screen keeps working without photos
                tracing::error!("❌ Photo storage unavailable: {}", reason);
                self.pending = None;
                self.feature = Feature::Unavailable(reason);
                self.status = "Photos are disabled on this device.".into();
                Task::none()
            }
            Message::PhotosLoaded(result) => {
                if let Err(reason) = result {
                    self.status = format!("Failed to load photos: {}", reason);
                }
                self.sync_gallery();
                Task::none()
            }
            Message::Capture(kind) => {
                let Feature::Ready {
                    coordinator,
                    capturing,
                    ..
                } = &mut self.feature
                else {
                    return Task::none();
                };
                if *capturing {
                    return Task::none();
                }
                *capturing = true;
                self.status = format!("Capturing {} photo...", kind);

                let coordinator = coordinator.clone();
                let request = CaptureRequest::new(self.job_id, self.customer_id, kind);
                Task::perform(
                    async move {
                        coordinator
                            .request_capture(request)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::Captured,
                )
            }
            Message::Captured(result) => {
                if let Feature::Ready { capturing, .. } = &mut self.feature {
                    *capturing = false;
                }
                self.status = match result {
                    Ok(CaptureOutcome::Saved(photo)) => {
                        format!("✅ Saved {} photo.", photo.kind)
                    }
                    Ok(CaptureOutcome::Cancelled) => "Ready.".into(),
                    Err(reason) => format!("⚠️  Capture failed: {}. Try again.", reason),
                };
                self.sync_gallery();
                Task::none()
            }
            Message::Open(id) => {
                if let Feature::Ready { gallery, .. } = &mut self.feature {
                    gallery.open(&id);
                }
                Task::none()
            }
            Message::CloseViewer => {
                if let Feature::Ready { gallery, .. } = &mut self.feature {
                    gallery.close_viewer();
                }
                Task::none()
            }
            Message::DeletePressed => {
                let Feature::Ready {
                    coordinator,
                    gallery,
                    ..
                } = &mut self.feature
                else {
                    return Task::none();
                };
                match gallery.press_delete() {
                    DeletePress::Execute(id) => {
                        let coordinator = coordinator.clone();
                        Task::perform(
                            async move {
                                coordinator.delete_photo(&id).await.map_err(|e| e.to_string())
                            },
                            Message::Deleted,
                        )
                    }
                    DeletePress::Armed | DeletePress::Ignored => Task::none(),
                }
            }
            Message::Deleted(result) => {
                if let Feature::Ready { gallery, .. } = &mut self.feature {
                    gallery.finish_delete(result.is_ok());
                }
                if let Err(reason) = result {
                    self.status = format!("⚠️  Delete failed: {}", reason);
                }
                self.sync_gallery();
                Task::none()
            }
        }
    }

    fn reload(&self, coordinator: Arc<Coordinator>) -> Task<Message> {
        let job_id = self.job_id;
        Task::perform(
            async move {
                coordinator
                    .refresh(job_id)
                    .await
                    .map(|photos| photos.len())
                    .map_err(|e| e.to_string())
            },
            Message::PhotosLoaded,
        )
    }

    /// Pull the latest feed value into the gallery and cache image handles
    fn sync_gallery(&mut self) {
        let Feature::Ready {
            gallery, handles, ..
        } = &mut self.feature
        else {
            return;
        };
        gallery.sync();

        let view = gallery.view();
        let photos = all_photos(view);
        handles.retain(|id, _| photos.iter().any(|p| &p.id == id));
        for photo in photos {
            handles
                .entry(photo.id.clone())
                .or_insert_with(|| Handle::from_bytes(photo.image.bytes.clone()));
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let body: Element<Message> = match &self.feature {
            Feature::Opening => text("Loading photos...").into(),
            Feature::Unavailable(reason) => {
                text(format!("Photos are not available on this device ({}).", reason))
                    .size(16)
                    .into()
            }
            Feature::Ready {
                gallery,
                capturing,
                handles,
                ..
            } => {
                if let Some(photo) = gallery.viewer().photo() {
                    return viewer(gallery, photo, handles);
                }
                column![capture_buttons(*capturing), gallery_section(gallery, handles)]
                    .spacing(20)
                    .into()
            }
        };

        let content: Column<Message> = column![
            text(format!("Job #{} photos", self.job_id)).size(32),
            body,
            text(&self.status).size(14),
        ]
        .spacing(20)
        .padding(30);

        container(scrollable(content))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn all_photos(view: &GalleryView) -> Vec<&Photo> {
    view.comparison
        .iter()
        .flat_map(|pair| [&pair.before, &pair.after])
        .chain(view.extra_before.iter())
        .chain(view.extra_after.iter())
        .collect()
}

fn capture_buttons(capturing: bool) -> Element<'static, Message> {
    // Disabled while a capture is in flight so one tap makes one photo
    let label = |kind: PhotoKind| {
        if capturing {
            format!("{} Photo...", kind.label())
        } else {
            format!("{} Photo", kind.label())
        }
    };

    row![
        button(text(label(PhotoKind::Before)))
            .on_press_maybe((!capturing).then_some(Message::Capture(PhotoKind::Before)))
            .padding(14),
        button(text(label(PhotoKind::After)))
            .on_press_maybe((!capturing).then_some(Message::Capture(PhotoKind::After)))
            .padding(14),
    ]
    .spacing(12)
    .into()
}

fn gallery_section<'a>(gallery: &'a Gallery, handles: &'a HashMap<PhotoId, Handle>) -> Element<'a, Message> {
    match gallery.state() {
        GalleryState::Loading => return text("Loading photos...").into(),
        GalleryState::Empty => return text("No photos yet").size(14).into(),
        GalleryState::Ready => {}
    }

    let view = gallery.view();
    let mut section = Column::new().spacing(16);

    if let Some(pair) = &view.comparison {
        section = section.push(text("BEFORE / AFTER").size(12)).push(
            row![thumbnail(&pair.before, handles), thumbnail(&pair.after, handles)].spacing(8),
        );
    }
    if !view.extra_before.is_empty() {
        section = section
            .push(text("BEFORE").size(12))
            .push(grid(&view.extra_before, handles));
    }
    if !view.extra_after.is_empty() {
        section = section
            .push(text("AFTER").size(12))
            .push(grid(&view.extra_after, handles));
    }

    section.into()
}

fn grid<'a>(photos: &'a [Photo], handles: &'a HashMap<PhotoId, Handle>) -> Element<'a, Message> {
    Column::with_children(photos.chunks(GRID_COLUMNS).map(|chunk| {
        Row::with_children(chunk.iter().map(|photo| thumbnail(photo, handles)))
            .spacing(8)
            .into()
    }))
    .spacing(8)
    .into()
}

fn thumbnail<'a>(photo: &'a Photo, handles: &'a HashMap<PhotoId, Handle>) -> Element<'a, Message> {
    let caption = text(format!(
        "{}  {}",
        photo.kind.label(),
        photo.timestamp.with_timezone(&Local).format("%H:%M")
    ))
    .size(12);

    let picture: Element<'a, Message> = match handles.get(&photo.id) {
        Some(handle) => iced::widget::image(handle.clone())
            .width(Length::Fixed(THUMBNAIL_WIDTH))
            .into(),
        None => text("…").into(),
    };

    button(column![picture, caption].spacing(4))
        .on_press(Message::Open(photo.id.clone()))
        .padding(4)
        .into()
}

fn viewer<'a>(
    gallery: &'a Gallery,
    photo: &'a Photo,
    handles: &'a HashMap<PhotoId, Handle>,
) -> Element<'a, Message> {
    let Some(details) = gallery.viewer().details() else {
        return text("").into();
    };

    let top_bar = row![
        button(text("Close")).on_press(Message::CloseViewer),
        text(details.kind_label).size(18),
        button(text(if details.confirm_hint.is_some() {
            "Delete?"
        } else {
            "Delete"
        }))
        .on_press(Message::DeletePressed),
    ]
    .spacing(20)
    .align_y(Alignment::Center);

    let picture: Element<'a, Message> = match handles.get(&photo.id) {
        Some(handle) => iced::widget::image(handle.clone())
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => text("Image unavailable").into(),
    };

    let mut info = Column::new().spacing(4).push(text(details.captured_at).size(14));
    if let Some(gps) = details.gps {
        info = info.push(text(gps).size(14));
    }
    if let Some(notes) = details.notes {
        info = info.push(text(notes).size(14));
    }
    if let Some(hint) = details.confirm_hint {
        info = info.push(text(hint).size(14));
    }

    container(column![top_bar, picture, info].spacing(12).padding(12))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn main() -> iced::Result {
    crew_photos::logging::init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(2);
        }
    };

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("⚠️  {}; using defaults", e);
        Config::default()
    });

    match command {
        Command::Export(path) => {
            run_export(&config.photo_store(), path);
            Ok(())
        }
        Command::Gallery {
            job_id,
            customer_id,
        } => iced::application("Crew Photos", CrewPhotos::update, CrewPhotos::view)
            .theme(CrewPhotos::theme)
            .centered()
            .run_with(move || CrewPhotos::new(job_id, customer_id, config)),
    }
}

fn run_export(store: &PhotoStore, path: PathBuf) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(export::export_all(store, &path)) {
        Ok(count) => println!("Exported {} photos to {}", count, path.display()),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_gallery() {
        assert_eq!(
            Command::parse(args(&["--job", "7", "--customer", "3"])),
            Ok(Command::Gallery {
                job_id: 7,
                customer_id: 3
            })
        );
    }

    #[test]
    fn test_parse_export() {
        assert_eq!(
            Command::parse(args(&["export", "photos.json"])),
            Ok(Command::Export(PathBuf::from("photos.json")))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse(args(&[])).is_err());
        assert!(Command::parse(args(&["--job", "seven", "--customer", "3"])).is_err());
        assert!(Command::parse(args(&["--job", "7"])).is_err());
        assert!(Command::parse(args(&["export"])).is_err());
    }
}
