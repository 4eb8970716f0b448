//! XProfile CLI commands
//!
//! Subcommand names keep their underscores (`create_group`, `set_data`, ...)
//! so existing scripts keep working.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use clap::{ArgAction, Args, Subcommand};

use super::output::{Output, OutputFormat};
use super::prompt::confirm;
use super::{parse_numeric_id, GetArgs, ListArgs, ServiceResultExt};
use crate::domain::{
    display_value, DataValue, Field, FieldRow, FieldType, Lookup, NewField, NewFieldGroup, User,
};
use crate::service::SiteService;

const FIELD_NOT_FOUND: &str = "Field not found.";

#[derive(Subcommand)]
pub enum XprofileCommands {
    /// Create a field group
    #[command(name = "create_group")]
    CreateGroup {
        /// Name of the field group
        #[arg(long)]
        name: String,

        /// Field group description
        #[arg(long, default_value = "")]
        description: String,

        /// Whether the field group can be deleted later
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        can_delete: bool,

        /// Output just the new field group id
        #[arg(long)]
        porcelain: bool,
    },

    /// Get a field group
    #[command(name = "get_group")]
    GetGroup {
        /// Field group ID
        field_group_id: String,

        #[command(flatten)]
        view: GetArgs,
    },

    /// Delete a field group with its fields and their data
    #[command(name = "delete_group")]
    DeleteGroup {
        /// Field group ID
        field_group_id: String,

        /// Answer yes to the confirmation message
        #[arg(long)]
        yes: bool,
    },

    /// List fields of all field groups, or of one
    #[command(name = "list_fields")]
    ListFields {
        /// Only fields of this field group
        #[arg(long)]
        group_id: Option<u64>,

        /// Include this user's value for each field (ID or login)
        #[arg(long)]
        user_id: Option<String>,

        #[command(flatten)]
        view: ListArgs,
    },

    /// Create a field
    #[command(name = "create_field")]
    CreateField(CreateFieldArgs),

    /// Delete one or more fields, by ID or name
    #[command(name = "delete_field")]
    DeleteField {
        /// Field IDs or names
        #[arg(required = true)]
        field_ids: Vec<String>,

        /// Also delete the data stored for the field
        #[arg(long)]
        delete_data: bool,

        /// Answer yes to the confirmation message
        #[arg(long)]
        yes: bool,
    },

    /// Get a field
    #[command(name = "get_field")]
    GetField {
        /// Field ID
        field_id: String,

        #[command(flatten)]
        view: GetArgs,
    },

    /// Set a user's value for a field
    #[command(name = "set_data")]
    SetData {
        #[command(flatten)]
        target: DataTarget,

        /// Value to store (comma separated for checkbox fields)
        #[arg(long)]
        value: String,
    },

    /// Get a user's value for a field
    #[command(name = "get_data")]
    GetData {
        #[command(flatten)]
        target: DataTarget,
    },

    /// Remove a user's value for a field
    #[command(name = "delete_data")]
    DeleteData {
        #[command(flatten)]
        target: DataTarget,
    },
}

#[derive(Args)]
pub struct CreateFieldArgs {
    /// Field group the field belongs to
    #[arg(long)]
    pub field_group_id: u64,

    /// Name of the field
    #[arg(long)]
    pub name: String,

    /// Field type
    #[arg(long = "type", default_value = "textbox")]
    pub field_type: FieldType,

    /// Field description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Whether a value is required
    #[arg(long)]
    pub is_required: bool,

    /// Whether the field can be deleted later
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub can_delete: bool,

    /// Output just the new field id
    #[arg(long)]
    pub porcelain: bool,
}

/// The user and field a data command acts on
#[derive(Args)]
pub struct DataTarget {
    /// User ID or login
    #[arg(long)]
    pub user_id: String,

    /// Field ID or name
    #[arg(long)]
    pub field_id: String,
}

pub fn run(cmd: XprofileCommands, service: &mut dyn SiteService, output: &Output) -> Result<()> {
    match cmd {
        XprofileCommands::CreateGroup { name, description, can_delete, porcelain } => {
            let group = NewFieldGroup { name, description, can_delete };
            create_field_group(service, output, &group, porcelain)
        }
        XprofileCommands::GetGroup { field_group_id, view } => {
            get_field_group(service, output, &field_group_id, &view)
        }
        XprofileCommands::DeleteGroup { field_group_id, yes } => {
            delete_field_group(service, output, &field_group_id, yes)
        }
        XprofileCommands::ListFields { group_id, user_id, view } => {
            list_fields(service, output, group_id, user_id.as_deref(), &view)
        }
        XprofileCommands::CreateField(args) => create_field(service, output, args),
        XprofileCommands::DeleteField { field_ids, delete_data, yes } => {
            delete_fields(service, output, &field_ids, delete_data, yes)
        }
        XprofileCommands::GetField { field_id, view } => get_field(service, output, &field_id, &view),
        XprofileCommands::SetData { target, value } => set_data(service, output, &target, &value),
        XprofileCommands::GetData { target } => get_data(service, output, &target),
        XprofileCommands::DeleteData { target } => delete_data(service, output, &target),
    }
}

fn create_field_group(
    service: &mut dyn SiteService,
    output: &Output,
    group: &NewFieldGroup,
    porcelain: bool,
) -> Result<()> {
    if group.name.trim().is_empty() {
        bail!("Please specify a field group name.");
    }

    let id = service.create_field_group(group)?;

    if porcelain {
        output.line(&id.to_string());
    } else {
        output.success(&format!(
            "Created XProfile field group \"{}\" (ID {}).",
            group.name, id
        ));
    }
    Ok(())
}

fn get_field_group(
    service: &mut dyn SiteService,
    output: &Output,
    field_group_id: &str,
    view: &GetArgs,
) -> Result<()> {
    let id = parse_numeric_id(field_group_id, "Please provide a numeric field group ID.")?;
    let group = service
        .get_field_group(id)
        .not_found_as("No field group found.")?;

    match &view.field {
        Some(field) => output.field(&group, field)?,
        None => output.record(&group, view.fields.as_deref())?,
    }
    Ok(())
}

fn delete_field_group(
    service: &mut dyn SiteService,
    output: &Output,
    field_group_id: &str,
    yes: bool,
) -> Result<()> {
    let id = parse_numeric_id(field_group_id, "Please provide a numeric field group ID.")?;

    if !confirm("Are you sure you want to delete this field group?", yes)? {
        output.line("Field group not deleted.");
        return Ok(());
    }

    match service.delete_field_group(id) {
        Ok(()) => {
            output.success("Field group deleted.");
            Ok(())
        }
        Err(e) => {
            output.verbose_ctx("xprofile", &format!("Deleting field group {} failed: {}", id, e));
            Err(anyhow!("Could not delete the field group."))
        }
    }
}

fn list_fields(
    service: &mut dyn SiteService,
    output: &Output,
    group_id: Option<u64>,
    user_id: Option<&str>,
    view: &ListArgs,
) -> Result<()> {
    let user = match user_id {
        Some(user) => Some(service.find_user(&Lookup::parse(user))?),
        None => None,
    };

    let groups = service.list_field_groups(group_id)?;
    output.verbose_ctx("xprofile", &format!("Loaded {} field groups", groups.len()));

    let by_id: BTreeMap<u64, Field> = groups
        .into_iter()
        .flat_map(|(_, fields)| fields)
        .map(|field| (field.id, field))
        .collect();

    let mut rows = Vec::with_capacity(by_id.len());
    for field in by_id.into_values() {
        let row = match &user {
            Some(user) => {
                let data = service.get_field_data(field.id, user.id)?;
                FieldRow::with_data(field, data)
            }
            None => FieldRow::new(field),
        };
        rows.push(row);
    }

    output.records(&rows, view.fields.as_deref())?;
    Ok(())
}

fn create_field(
    service: &mut dyn SiteService,
    output: &Output,
    args: CreateFieldArgs,
) -> Result<()> {
    if args.name.trim().is_empty() {
        bail!("Please specify a field name.");
    }

    let field = NewField {
        group_id: args.field_group_id,
        field_type: args.field_type,
        name: args.name,
        description: args.description,
        is_required: args.is_required,
        can_delete: args.can_delete,
    };
    output.verbose_ctx(
        "xprofile",
        &format!("Creating {} field in group {}", field.field_type, field.group_id),
    );

    let id = service.create_field(&field)?;

    if args.porcelain {
        output.line(&id.to_string());
    } else {
        output.success(&format!("Created XProfile field \"{}\" (ID {}).", field.name, id));
    }
    Ok(())
}

fn delete_fields(
    service: &mut dyn SiteService,
    output: &Output,
    field_ids: &[String],
    delete_data: bool,
    yes: bool,
) -> Result<()> {
    for field_id in field_ids {
        let field = service
            .resolve_field(&Lookup::parse(field_id))
            .not_found_as(FIELD_NOT_FOUND)?;

        let prompt = format!("Are you sure you want to delete field \"{}\"?", field.name);
        if !confirm(&prompt, yes)? {
            output.line(&format!("Field \"{}\" not deleted.", field.name));
            continue;
        }

        service.delete_field(field.id, delete_data)?;
        output.success(&format!(
            "Deleted XProfile field \"{}\" (ID {}).",
            field.name, field.id
        ));
    }
    Ok(())
}

fn get_field(
    service: &mut dyn SiteService,
    output: &Output,
    field_id: &str,
    view: &GetArgs,
) -> Result<()> {
    let id = parse_numeric_id(field_id, "Please provide a numeric field ID.")?;
    let field = service
        .get_field(id)
        .not_found_as("No XProfile field found.")?;
    if !field.has_identity() {
        bail!("No XProfile field found.");
    }

    match &view.field {
        Some(name) => output.field(&field, name)?,
        None => output.record(&field, view.fields.as_deref())?,
    }
    Ok(())
}

/// Resolves the user and field of a data command
fn resolve_target(service: &dyn SiteService, target: &DataTarget) -> Result<(User, Field)> {
    let user = service.find_user(&Lookup::parse(&target.user_id))?;
    let field = service
        .resolve_field(&Lookup::parse(&target.field_id))
        .not_found_as(FIELD_NOT_FOUND)?;
    Ok((user, field))
}

fn set_data(
    service: &mut dyn SiteService,
    output: &Output,
    target: &DataTarget,
    value: &str,
) -> Result<()> {
    let (user, field) = resolve_target(service, target)?;

    let data = DataValue::for_field(field.field_type, value);
    if data.is_empty() {
        bail!("Please provide a value to set.");
    }

    service.set_field_data(field.id, user.id, &data)?;
    output.success(&format!(
        "Updated XProfile field \"{}\" (ID {}) with value \"{}\" for user {} (ID {}).",
        field.name, field.id, value, user.user_login, user.id
    ));
    Ok(())
}

fn get_data(service: &mut dyn SiteService, output: &Output, target: &DataTarget) -> Result<()> {
    let (user, field) = resolve_target(service, target)?;

    let data = service
        .get_field_data(field.id, user.id)?
        .ok_or_else(|| anyhow!("No XProfile data found."))?;

    output.line(&render_data(&data, output.format())?);
    Ok(())
}

fn delete_data(service: &mut dyn SiteService, output: &Output, target: &DataTarget) -> Result<()> {
    let (user, field) = resolve_target(service, target)?;

    service.delete_field_data(field.id, user.id)?;
    output.success("XProfile data removed.");
    Ok(())
}

/// A stored value as a scalar line, or structured for json/yaml
fn render_data(data: &DataValue, format: OutputFormat) -> Result<String> {
    let value = data.to_json();
    let text = match format {
        OutputFormat::Table | OutputFormat::Csv => display_value(&value),
        OutputFormat::Json => serde_json::to_string(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?.trim_end().to_string(),
    };
    Ok(text)
}
