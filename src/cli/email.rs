//! Email CLI commands
//!
//! Every email command acts on one site. The target site is entered through
//! a [`SiteContext`] switch and each service call receives the switched
//! site explicitly; the previous site is back in place once the command
//! body returns, whether it succeeded or not.

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};

use super::output::Output;
use super::prompt::{confirm, edit, read_content_source};
use super::{GetArgs, ListArgs, ServiceResultExt};
use crate::domain::NewEmail;
use crate::service::{ServiceError, SiteContext, SiteId, SiteService, PRIMARY_SITE};

#[derive(Subcommand)]
pub enum EmailCommands {
    /// Create a new email post bound to a new email type
    Create(CreateEmailArgs),

    /// Get the email post bound to an email type
    #[command(name = "get-post")]
    GetPost {
        /// Email type slug
        email_type: String,

        /// Site to act on (multisite only)
        #[arg(long)]
        site: Option<SiteId>,

        #[command(flatten)]
        view: GetArgs,
    },

    /// Replace all emails with the default set
    Reinstall {
        /// Site to act on (multisite only)
        #[arg(long)]
        site: Option<SiteId>,

        /// Answer yes to the confirmation message
        #[arg(long)]
        yes: bool,
    },

    /// List installed emails
    List {
        /// Site to act on (multisite only)
        #[arg(long)]
        site: Option<SiteId>,

        #[command(flatten)]
        view: ListArgs,
    },
}

#[derive(Args)]
pub struct CreateEmailArgs {
    /// Read content from this file, or from standard input with `-`
    pub source: Option<String>,

    /// Email type slug
    #[arg(long = "type")]
    pub email_type: Option<String>,

    /// Email subject
    #[arg(long)]
    pub subject: Option<String>,

    /// Email content (HTML)
    #[arg(long)]
    pub content: Option<String>,

    /// Plain text version of the content
    #[arg(long)]
    pub plain_text_content: Option<String>,

    /// Description of the email type
    #[arg(long)]
    pub type_description: Option<String>,

    /// Open the content in the editor before saving
    #[arg(long)]
    pub edit: bool,

    /// Site to act on (multisite only)
    #[arg(long)]
    pub site: Option<SiteId>,

    /// Output just the new post id
    #[arg(long)]
    pub porcelain: bool,
}

pub fn run(
    cmd: EmailCommands,
    service: &mut dyn SiteService,
    output: &Output,
    editor: Option<&str>,
) -> Result<()> {
    let mut context = SiteContext::new(PRIMARY_SITE);

    match cmd {
        EmailCommands::Create(args) => {
            let target = target_site(service, args.site)?;
            let post_id = in_site(&mut context, target, output, |site| {
                create_email(service, output, site, &args, editor)
            })?;

            if args.porcelain {
                output.line(&post_id.to_string());
            } else {
                let email_type = args.email_type.as_deref().unwrap_or_default().trim();
                output.success(&format!("Email \"{}\" created.", email_type));
            }
        }
        EmailCommands::GetPost { email_type, site, view } => {
            let target = target_site(service, site)?;
            let post = in_site(&mut context, target, output, |site| {
                service
                    .get_email_post(site, &email_type)
                    .not_found_as(format!("No email found for type \"{}\".", email_type))
            })?;

            match &view.field {
                Some(field) => output.field(&post, field)?,
                None => output.record(&post, view.fields.as_deref())?,
            }
        }
        EmailCommands::Reinstall { site, yes } => {
            let target = target_site(service, site)?;
            if !confirm("Are you sure you want to reinstall the emails?", yes)? {
                output.line("Emails not reinstalled.");
                return Ok(());
            }

            let message = in_site(&mut context, target, output, |site| {
                Ok(service.reinstall_emails(site)?)
            })?;
            output.success(&message);
        }
        EmailCommands::List { site, view } => {
            let target = target_site(service, site)?;
            let posts = in_site(&mut context, target, output, |site| {
                Ok(service.list_email_posts(site)?)
            })?;
            output.records(&posts, view.fields.as_deref())?;
        }
    }

    Ok(())
}

/// The site a command should act on
fn target_site(service: &dyn SiteService, requested: Option<SiteId>) -> Result<SiteId> {
    match requested {
        None => Ok(PRIMARY_SITE),
        Some(site) if site == PRIMARY_SITE || service.is_multisite() => Ok(site),
        Some(site) => bail!("Site {} not found: this is not a multisite network.", site),
    }
}

/// Runs `body` with `site` switched in, restoring the previous site after
fn in_site<T>(
    context: &mut SiteContext,
    site: SiteId,
    output: &Output,
    body: impl FnOnce(SiteId) -> Result<T>,
) -> Result<T> {
    let switch = context.switch(site);
    let previous = switch.previous();
    if switch.switched() {
        output.verbose_ctx("site", &format!("Switched from site {} to site {}", previous, site));
    }

    let result = body(switch.site());
    drop(switch);

    if previous != site {
        output.verbose_ctx("site", &format!("Restored site {}", context.current()));
    }
    result
}

/// Validates the input, then writes the post and its type term.
/// Returns the new post id.
fn create_email(
    service: &mut dyn SiteService,
    output: &Output,
    site: SiteId,
    args: &CreateEmailArgs,
    editor: Option<&str>,
) -> Result<u64> {
    let email_type = match args.email_type.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => bail!("Missing email type."),
    };
    let not_created = |e: ServiceError| {
        output.verbose_ctx("email", &format!("Service failure: {}", e));
        anyhow!("Email \"{}\" was not created.", email_type)
    };

    if service.email_type_exists(site, email_type).map_err(not_created)? {
        bail!("Email type \"{}\" already exists.", email_type);
    }

    let subject = match args.subject.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => bail!("Missing email subject."),
    };

    let mut content = match &args.source {
        Some(source) => read_content_source(source)?,
        None => args.content.clone().unwrap_or_default(),
    };

    if args.edit {
        match edit(&content, editor)? {
            Some(edited) if !edited.trim().is_empty() => content = edited,
            _ => output.verbose_ctx("email", "Editor returned nothing, keeping content"),
        }
    }

    if content.trim().is_empty() {
        bail!("Missing email content.");
    }

    let email = NewEmail {
        email_type: email_type.to_string(),
        subject: subject.to_string(),
        content,
        plain_text_content: args.plain_text_content.clone(),
    };

    let post_id = service.insert_email_post(site, &email).map_err(not_created)?;
    output.verbose_ctx("email", &format!("Inserted post {} on site {}", post_id, site));

    if let Err(e) = bind_type(service, site, email_type, post_id, args.type_description.as_deref()) {
        if let Err(cleanup) = service.delete_email_post(site, post_id) {
            output.verbose_ctx("email", &format!("Could not remove post {}: {}", post_id, cleanup));
        }
        return Err(not_created(e));
    }

    Ok(post_id)
}

/// Binds the type term to the post and describes it
fn bind_type(
    service: &mut dyn SiteService,
    site: SiteId,
    email_type: &str,
    post_id: u64,
    description: Option<&str>,
) -> Result<(), ServiceError> {
    let term_id = service.bind_email_type(site, email_type, post_id)?;
    if let Some(description) = description {
        service.describe_email_type(site, term_id, description)?;
    }
    Ok(())
}
