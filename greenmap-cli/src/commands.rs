//! Subcommands and their execution against a [`CatalogStore`].

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Args, Subcommand};
use geo::{Rect, coord};
use greenmap_core::{
    CatalogStore, Coords, GreenKind, GreenObject, LocalCache, NewObject, ObjectId, ObjectPatch,
    RemoteStore, SaveOutcome,
};
use log::{debug, info};

use crate::CliError;

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List catalogued objects, optionally of a single type.
    List {
        /// Only list objects of this type.
        #[arg(long = "type", value_name = "type")]
        kind: Option<GreenKind>,
    },
    /// Print one object as JSON.
    Show {
        /// Identifier of the object.
        id: String,
    },
    /// Add a new object.
    Add(AddArgs),
    /// Change fields of an existing object.
    Update(UpdateArgs),
    /// Remove an object.
    Delete {
        /// Identifier of the object.
        id: String,
    },
    /// Print totals per type and the last update time.
    Stats,
    /// List objects inside a bounding box.
    Bbox(BboxArgs),
    /// Write the catalogue as JSON to a file or standard output.
    Export {
        /// Destination file; standard output when omitted.
        #[arg(long, short, value_name = "path")]
        output: Option<Utf8PathBuf>,
    },
    /// Append the objects of an exported catalogue.
    Import {
        /// Exported catalogue to read.
        #[arg(id = "import_path", value_name = "PATH")]
        path: Utf8PathBuf,
    },
    /// Save the catalogue to the remote store now.
    Sync,
}

#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Object type, e.g. `tree`, `lawn` or `bush`.
    #[arg(long = "type", value_name = "type")]
    kind: GreenKind,
    /// Latitude in degrees.
    #[arg(long, allow_negative_numbers = true, value_parser = finite_degrees)]
    lat: f64,
    /// Longitude in degrees.
    #[arg(long, allow_negative_numbers = true, value_parser = finite_degrees)]
    lon: f64,
    /// Display name.
    #[arg(long)]
    name: Option<String>,
    /// Condition, e.g. `good` or `poor`.
    #[arg(long)]
    condition: Option<String>,
    /// Free-form notes.
    #[arg(long)]
    description: Option<String>,
}

impl AddArgs {
    fn into_draft(self) -> NewObject {
        let mut draft = NewObject::new(self.kind, Coords::new(self.lat, self.lon));
        if let Some(name) = self.name {
            draft = draft.with_name(name);
        }
        if let Some(condition) = self.condition {
            draft = draft.with_condition(condition);
        }
        if let Some(description) = self.description {
            draft = draft.with_description(description);
        }
        draft
    }
}

#[derive(Debug, Args)]
pub(crate) struct UpdateArgs {
    /// Identifier of the object.
    id: String,
    /// New object type.
    #[arg(long = "type", value_name = "type")]
    kind: Option<GreenKind>,
    /// New latitude; requires `--lon`.
    #[arg(long, requires = "lon", allow_negative_numbers = true, value_parser = finite_degrees)]
    lat: Option<f64>,
    /// New longitude; requires `--lat`.
    #[arg(long, requires = "lat", allow_negative_numbers = true, value_parser = finite_degrees)]
    lon: Option<f64>,
    /// New display name.
    #[arg(long)]
    name: Option<String>,
    /// New condition.
    #[arg(long)]
    condition: Option<String>,
    /// New notes.
    #[arg(long)]
    description: Option<String>,
}

impl UpdateArgs {
    fn into_patch(self) -> (ObjectId, ObjectPatch) {
        let mut patch = ObjectPatch::default();
        if let Some(kind) = self.kind {
            patch = patch.kind(kind);
        }
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            patch = patch.coords(Coords::new(lat, lon));
        }
        if let Some(name) = self.name {
            patch = patch.name(name);
        }
        if let Some(condition) = self.condition {
            patch = patch.condition(condition);
        }
        if let Some(description) = self.description {
            patch = patch.description(description);
        }
        (ObjectId::new(self.id), patch)
    }
}

#[derive(Debug, Args)]
pub(crate) struct BboxArgs {
    /// Southern latitude.
    #[arg(long, allow_negative_numbers = true, value_parser = finite_degrees)]
    south: f64,
    /// Western longitude.
    #[arg(long, allow_negative_numbers = true, value_parser = finite_degrees)]
    west: f64,
    /// Northern latitude.
    #[arg(long, allow_negative_numbers = true, value_parser = finite_degrees)]
    north: f64,
    /// Eastern longitude.
    #[arg(long, allow_negative_numbers = true, value_parser = finite_degrees)]
    east: f64,
}

impl BboxArgs {
    fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }
}

/// Run `command` against an initialised store, writing results to `out`.
pub(crate) async fn execute<C, R, W>(
    store: &mut CatalogStore<C, R>,
    command: Command,
    out: &mut W,
) -> Result<(), CliError>
where
    C: LocalCache,
    R: RemoteStore,
    W: Write,
{
    debug!("executing {command:?}");
    match command {
        Command::List { kind } => {
            let objects = match kind {
                Some(kind) => store.get_objects_by_type(&kind),
                None => store.get_all_objects(),
            };
            write_rows(out, objects.iter())
        }
        Command::Show { id } => {
            let object = store
                .find_object(&ObjectId::new(id.as_str()))
                .ok_or(CliError::NotFound { id })?;
            let text = serde_json::to_string_pretty(object).map_err(CliError::Serialize)?;
            writeln!(out, "{text}").map_err(CliError::Output)
        }
        Command::Add(args) => {
            let object = store.add_object(args.into_draft()).await;
            info!("added {} {}", object.kind, object.id);
            write_rows(out, std::iter::once(&object))
        }
        Command::Update(args) => {
            let (id, patch) = args.into_patch();
            if patch.is_empty() {
                return Err(CliError::EmptyUpdate { id: id.to_string() });
            }
            let updated = store
                .update_object(&id, patch)
                .await
                .ok_or_else(|| CliError::NotFound { id: id.to_string() })?;
            write_rows(out, std::iter::once(&updated))
        }
        Command::Delete { id } => {
            if store.delete_object(&ObjectId::new(id.as_str())).await {
                writeln!(out, "deleted {id}").map_err(CliError::Output)
            } else {
                Err(CliError::NotFound { id })
            }
        }
        Command::Stats => {
            let stats = store.get_statistics();
            let last_update = stats
                .last_update
                .map_or_else(|| "never".to_owned(), |at| at.to_rfc3339());
            writeln!(
                out,
                "total\t{}\ntree\t{}\nlawn\t{}\nbush\t{}\nlast update\t{last_update}",
                stats.total, stats.by_type.tree, stats.by_type.lawn, stats.by_type.bush,
            )
            .map_err(CliError::Output)
        }
        Command::Bbox(args) => write_rows(out, store.get_objects_in_bbox(args.to_rect())),
        Command::Export { output } => {
            let text = store.export_data()?;
            match output {
                Some(path) => greenmap_fs::write_file(&path, &text)
                    .map_err(|source| CliError::WriteExport { path, source }),
                None => writeln!(out, "{text}").map_err(CliError::Output),
            }
        }
        Command::Import { path } => {
            let text = greenmap_fs::read_file(&path)
                .map_err(|source| CliError::ReadImport { path, source })?;
            let imported = store.import_data(&text).await?;
            writeln!(out, "imported {imported} objects").map_err(CliError::Output)
        }
        Command::Sync => match store.save_remote().await {
            SaveOutcome::Saved => writeln!(out, "saved").map_err(CliError::Output),
            SaveOutcome::Skipped => {
                writeln!(out, "skipped: offline or no access token").map_err(CliError::Output)
            }
            SaveOutcome::Failed(err) => Err(err.into()),
        },
    }
}

/// Parse a coordinate, refusing `NaN` and infinities.
fn finite_degrees(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{raw} is not a finite number of degrees"))
    }
}

fn write_rows<'a, W: Write>(
    out: &mut W,
    objects: impl Iterator<Item = &'a GreenObject>,
) -> Result<(), CliError> {
    for object in objects {
        writeln!(
            out,
            "{}\t{}\t{},{}\t{}",
            object.id, object.kind, object.coords.lat, object.coords.lon, object.name
        )
        .map_err(CliError::Output)?;
    }
    Ok(())
}
