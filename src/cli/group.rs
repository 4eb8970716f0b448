//! Group CLI commands

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};

use super::output::Output;
use super::prompt::confirm;
use super::{GetArgs, ListArgs, ServiceResultExt};
use crate::domain::{
    GroupChanges, GroupOrderBy, GroupQuery, GroupStatus, Lookup, NewGroup, SortOrder,
};
use crate::service::{ServiceError, SiteService};

const GROUP_NOT_FOUND: &str = "No group found by that slug or ID.";

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a group
    Create(CreateArgs),

    /// Get a group by ID or slug
    Get {
        /// Group ID or slug
        group_id: String,

        #[command(flatten)]
        view: GetArgs,
    },

    /// Update one or more groups
    Update {
        /// Group IDs or slugs
        #[arg(required = true)]
        group_ids: Vec<String>,

        #[command(flatten)]
        changes: UpdateArgs,
    },

    /// Delete one or more groups
    Delete {
        /// Group IDs or slugs
        #[arg(required = true)]
        group_ids: Vec<String>,

        /// Answer yes to the confirmation message
        #[arg(long)]
        yes: bool,
    },

    /// List groups
    List(GroupListArgs),
}

#[derive(Args)]
pub struct CreateArgs {
    /// Name of the group
    #[arg(long)]
    pub name: Option<String>,

    /// URL-safe slug (derived from the name when omitted)
    #[arg(long)]
    pub slug: Option<String>,

    /// Group description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Creator, by user ID or login
    #[arg(long, default_value = "1")]
    pub creator_id: String,

    /// Group status (public, private, hidden)
    #[arg(long, default_value = "public")]
    pub status: GroupStatus,

    /// Enable the group forum
    #[arg(long)]
    pub enable_forum: bool,

    /// Output just the new group id
    #[arg(long)]
    pub porcelain: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New slug
    #[arg(long)]
    pub slug: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New status (public, private, hidden)
    #[arg(long)]
    pub status: Option<GroupStatus>,

    /// Enable or disable the forum
    #[arg(long)]
    pub enable_forum: Option<bool>,
}

impl UpdateArgs {
    fn into_changes(self) -> GroupChanges {
        GroupChanges {
            name: self.name,
            slug: self.slug,
            description: self.description,
            status: self.status,
            enable_forum: self.enable_forum,
        }
    }
}

#[derive(Args)]
pub struct GroupListArgs {
    /// Only groups created by this user (ID or login)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Only groups with this status
    #[arg(long)]
    pub status: Option<GroupStatus>,

    /// Include hidden groups
    #[arg(long)]
    pub show_hidden: bool,

    /// Sort field (id, name, date_created)
    #[arg(long, default_value = "id")]
    pub orderby: GroupOrderBy,

    /// Sort direction (asc, desc)
    #[arg(long, default_value = "asc")]
    pub order: SortOrder,

    /// Maximum number of groups to show
    #[arg(long)]
    pub per_page: Option<usize>,

    #[command(flatten)]
    pub view: ListArgs,
}

pub fn run(cmd: GroupCommands, service: &mut dyn SiteService, output: &Output) -> Result<()> {
    match cmd {
        GroupCommands::Create(args) => create_group(service, output, args),
        GroupCommands::Get { group_id, view } => get_group(service, output, &group_id, &view),
        GroupCommands::Update { group_ids, changes } => {
            update_groups(service, output, &group_ids, &changes.into_changes())
        }
        GroupCommands::Delete { group_ids, yes } => delete_groups(service, output, &group_ids, yes),
        GroupCommands::List(args) => list_groups(service, output, args),
    }
}

fn create_group(service: &mut dyn SiteService, output: &Output, args: CreateArgs) -> Result<()> {
    let name = args
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("Please specify a group name."))?;

    let creator = service.find_user(&Lookup::parse(&args.creator_id))?;
    output.verbose_ctx("group", &format!("Creating group as user {}", creator.id));

    let group = NewGroup {
        name: name.to_string(),
        slug: args.slug,
        description: args.description,
        creator_id: creator.id,
        status: args.status,
        enable_forum: args.enable_forum,
    };

    let id = service.create_group(&group).map_err(|e| match e {
        ServiceError::Validation(_) => anyhow::Error::from(e),
        other => anyhow::Error::from(other).context("Could not create group."),
    })?;

    if args.porcelain {
        output.line(&id.to_string());
    } else {
        let created = service.find_group(&Lookup::Id(id))?;
        output.success(&format!("Group (ID {}) created: {}", id, created.url));
    }

    Ok(())
}

fn get_group(
    service: &mut dyn SiteService,
    output: &Output,
    group_id: &str,
    view: &GetArgs,
) -> Result<()> {
    let group = service
        .find_group(&Lookup::parse(group_id))
        .not_found_as(GROUP_NOT_FOUND)?;

    match &view.field {
        Some(field) => output.field(&group, field)?,
        None => output.record(&group, view.fields.as_deref())?,
    }

    Ok(())
}

fn update_groups(
    service: &mut dyn SiteService,
    output: &Output,
    group_ids: &[String],
    changes: &GroupChanges,
) -> Result<()> {
    for group_id in group_ids {
        let group = service
            .find_group(&Lookup::parse(group_id))
            .not_found_as(GROUP_NOT_FOUND)?;

        if changes.is_empty() {
            output.verbose_ctx("group", &format!("No changes for group {}", group.id));
        }

        service
            .update_group(group.id, changes)
            .with_context(|| format!("Could not update group {}.", group_id))?;
        output.success(&format!("Group {} updated.", group_id));
    }

    Ok(())
}

fn delete_groups(
    service: &mut dyn SiteService,
    output: &Output,
    group_ids: &[String],
    yes: bool,
) -> Result<()> {
    for group_id in group_ids {
        let group = service
            .find_group(&Lookup::parse(group_id))
            .not_found_as(GROUP_NOT_FOUND)?;

        if !confirm(&format!("Are you sure you want to delete group {}?", group_id), yes)? {
            output.line(&format!("Group {} not deleted.", group_id));
            continue;
        }

        service
            .delete_group(group.id)
            .with_context(|| format!("Could not delete group {}.", group_id))?;
        output.success(&format!("Group {} deleted.", group_id));
    }

    Ok(())
}

fn list_groups(service: &mut dyn SiteService, output: &Output, args: GroupListArgs) -> Result<()> {
    let creator_id = match &args.user_id {
        Some(user) => Some(service.find_user(&Lookup::parse(user))?.id),
        None => None,
    };

    let query = GroupQuery {
        creator_id,
        status: args.status,
        show_hidden: args.show_hidden,
        orderby: args.orderby,
        order: args.order,
        per_page: args.per_page,
    };
    output.verbose_ctx("group", &format!("Listing groups: {:?}", query));

    let groups = service.list_groups(&query)?;
    output.verbose_ctx("group", &format!("Found {} groups", groups.len()));

    output.records(&groups, args.view.fields.as_deref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::service::{LocalService, LocalSettings};

    fn service() -> LocalService {
        let mut service = LocalService::in_memory(LocalSettings::default()).unwrap();
        service.install("admin@example.com").unwrap();
        service
    }

    fn output() -> Output {
        Output::new(OutputFormat::Json, false)
    }

    fn create_args(name: Option<&str>) -> CreateArgs {
        CreateArgs {
            name: name.map(str::to_string),
            slug: None,
            description: String::new(),
            creator_id: "admin".to_string(),
            status: GroupStatus::Public,
            enable_forum: false,
            porcelain: true,
        }
    }

    #[test]
    fn create_requires_name() {
        let mut service = service();
        let err = create_group(&mut service, &output(), create_args(None)).unwrap_err();
        assert_eq!(err.to_string(), "Please specify a group name.");

        let err = create_group(&mut service, &output(), create_args(Some("  "))).unwrap_err();
        assert_eq!(err.to_string(), "Please specify a group name.");
    }

    #[test]
    fn create_resolves_creator_login() {
        let mut service = service();
        create_group(&mut service, &output(), create_args(Some("Mine"))).unwrap();

        let group = service.find_group(&Lookup::Name("mine".into())).unwrap();
        assert_eq!(group.creator_id, 1);
    }

    #[test]
    fn create_with_unknown_creator_fails() {
        let mut service = service();
        let mut args = create_args(Some("Orphan"));
        args.creator_id = "nobody".into();
        assert!(create_group(&mut service, &output(), args).is_err());
    }

    #[test]
    fn get_missing_group_reports_not_found() {
        let mut service = service();
        let err = get_group(&mut service, &output(), "404", &GetArgs::default()).unwrap_err();
        assert_eq!(err.to_string(), GROUP_NOT_FOUND);

        let args = GetArgs::default();
        let err = get_group(&mut service, &output(), "no-such-slug", &args).unwrap_err();
        assert_eq!(err.to_string(), GROUP_NOT_FOUND);
    }

    #[test]
    fn update_with_no_changes_succeeds() {
        let mut service = service();
        create_group(&mut service, &output(), create_args(Some("Stable"))).unwrap();
        update_groups(
            &mut service,
            &output(),
            &["stable".to_string()],
            &GroupChanges::default(),
        )
        .unwrap();
    }

    #[test]
    fn delete_then_get_fails() {
        let mut service = service();
        create_group(&mut service, &output(), create_args(Some("Doomed"))).unwrap();
        delete_groups(&mut service, &output(), &["doomed".to_string()], true).unwrap();

        let err = get_group(&mut service, &output(), "doomed", &GetArgs::default()).unwrap_err();
        assert_eq!(err.to_string(), GROUP_NOT_FOUND);
    }

    #[test]
    fn invalid_projection_fails() {
        let mut service = service();
        create_group(&mut service, &output(), create_args(Some("Shown"))).unwrap();
        let view = GetArgs {
            fields: Some(vec!["bogus".into()]),
            field: None,
        };
        let err = get_group(&mut service, &output(), "shown", &view).unwrap_err();
        assert_eq!(err.to_string(), "Invalid field: bogus.");
    }
}
