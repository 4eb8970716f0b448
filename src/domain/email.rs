//! Transactional email templates
//!
//! An email is a content post of type [`EMAIL_POST_TYPE`] bound to a
//! unique type slug by a taxonomy term. The term also carries the
//! human-readable description of when the email is sent.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::record::Record;

/// Post type every email post is stored under
pub const EMAIL_POST_TYPE: &str = "bp-email";

/// An installed email post, joined with its type term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailPost {
    pub id: u64,
    #[serde(rename = "type")]
    pub email_type: String,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub plain_text_content: String,
    #[serde(default)]
    pub type_description: String,
    pub status: String,
    pub date_created: String,
}

impl Record for EmailPost {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "type",
        "subject",
        "content",
        "plain_text_content",
        "type_description",
        "status",
        "date_created",
    ];

    fn value(&self, column: &str) -> Option<Value> {
        let value = match column {
            "id" => json!(self.id),
            "type" => json!(self.email_type),
            "subject" => json!(self.subject),
            "content" => json!(self.content),
            "plain_text_content" => json!(self.plain_text_content),
            "type_description" => json!(self.type_description),
            "status" => json!(self.status),
            "date_created" => json!(self.date_created),
            _ => return None,
        };
        Some(value)
    }
}

/// Input for inserting an email post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmail {
    #[serde(rename = "type")]
    pub email_type: String,
    pub subject: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plain_text_content: Option<String>,
}

/// A built-in email shipped with the site
#[derive(Debug, Clone, Copy)]
pub struct EmailTemplate {
    pub email_type: &'static str,
    pub subject: &'static str,
    pub content: &'static str,
    pub plain_text_content: &'static str,
    pub description: &'static str,
}

/// The emails a fresh site installs, and what `email reinstall` restores
pub fn default_emails() -> &'static [EmailTemplate] {
    &[
        EmailTemplate {
            email_type: "activity-comment",
            subject: "[{{{site.name}}}] {{poster.name}} replied to one of your updates",
            content: "{{poster.name}} replied to one of your updates:\n\n<blockquote>&quot;{{usermessage}}&quot;</blockquote>\n\n<a href=\"{{{thread.url}}}\">Go to the discussion</a> to reply or catch up on the conversation.",
            plain_text_content: "{{poster.name}} replied to one of your updates:\n\n\"{{usermessage}}\"\n\nGo to the discussion to reply or catch up on the conversation: {{{thread.url}}}",
            description: "A member has replied to an activity update that the recipient posted.",
        },
        EmailTemplate {
            email_type: "activity-at-message",
            subject: "[{{{site.name}}}] {{poster.name}} mentioned you in a status update",
            content: "{{poster.name}} mentioned you in a status update:\n\n<blockquote>&quot;{{usermessage}}&quot;</blockquote>\n\n<a href=\"{{{mentioned.url}}}\">Go to the discussion</a> to reply or catch up on the conversation.",
            plain_text_content: "{{poster.name}} mentioned you in a status update:\n\n\"{{usermessage}}\"\n\nGo to the discussion to reply or catch up on the conversation: {{{mentioned.url}}}",
            description: "Recipient was mentioned in an activity update.",
        },
        EmailTemplate {
            email_type: "core-user-registration",
            subject: "[{{{site.name}}}] Activate your account",
            content: "Thanks for registering!\n\nTo complete the activation of your account, go to the following link: <a href=\"{{{activate.url}}}\">{{{activate.url}}}</a>",
            plain_text_content: "Thanks for registering!\n\nTo complete the activation of your account, go to the following link: {{{activate.url}}}",
            description: "Recipient has registered for an account.",
        },
        EmailTemplate {
            email_type: "friends-request",
            subject: "[{{{site.name}}}] New friendship request from {{initiator.name}}",
            content: "<a href=\"{{{initiator.url}}}\">{{initiator.name}}</a> wants to add you as a friend.\n\nTo accept this request and manage all of your pending requests, visit: <a href=\"{{{friend-requests.url}}}\">{{{friend-requests.url}}}</a>",
            plain_text_content: "{{initiator.name}} wants to add you as a friend.\n\nTo accept this request and manage all of your pending requests, visit: {{{friend-requests.url}}}",
            description: "A member has sent a friend request to the recipient.",
        },
        EmailTemplate {
            email_type: "groups-details-updated",
            subject: "[{{{site.name}}}] Group details updated",
            content: "Group details for the group &quot;<a href=\"{{{group.url}}}\">{{group.name}}</a>&quot; were updated:\n<blockquote>{{changed_text}}</blockquote>",
            plain_text_content: "Group details for the group \"{{group.name}}\" were updated:\n\n{{changed_text}}\n\nTo view the group, visit: {{{group.url}}}",
            description: "A group's details were updated.",
        },
        EmailTemplate {
            email_type: "groups-invitation",
            subject: "[{{{site.name}}}] You have an invitation to the group: \"{{group.name}}\"",
            content: "<a href=\"{{{inviter.url}}}\">{{inviter.name}}</a> has invited you to join the group: &quot;{{group.name}}&quot;.\n\n<a href=\"{{{invites.url}}}\">Go here to accept your invitation</a> or <a href=\"{{{group.url}}}\">visit the group</a> to learn more.",
            plain_text_content: "{{inviter.name}} has invited you to join the group: \"{{group.name}}\".\n\nTo accept your invitation, visit: {{{invites.url}}}\n\nTo learn more about the group, visit: {{{group.url}}}.",
            description: "A member has sent a group invitation to the recipient.",
        },
        EmailTemplate {
            email_type: "groups-membership-request",
            subject: "[{{{site.name}}}] Membership request for group: {{group.name}}",
            content: "<a href=\"{{{profile.url}}}\">{{requesting-user.name}}</a> wants to join the group &quot;{{group.name}}&quot;.\n\n<a href=\"{{{group-requests.url}}}\">Manage this and all pending requests</a>.",
            plain_text_content: "{{requesting-user.name}} wants to join the group \"{{group.name}}\".\n\nTo manage this and all pending requests, visit: {{{group-requests.url}}}",
            description: "A member has requested permission to join a group.",
        },
        EmailTemplate {
            email_type: "messages-unread",
            subject: "[{{{site.name}}}] New message from {{sender.name}}",
            content: "{{sender.name}} sent you a new message: &quot;{{usersubject}}&quot;\n\n<blockquote>&quot;{{usermessage}}&quot;</blockquote>\n\n<a href=\"{{{message.url}}}\">Go to the discussion</a> to reply or catch up on the conversation.",
            plain_text_content: "{{sender.name}} sent you a new message: \"{{usersubject}}\"\n\n\"{{usermessage}}\"\n\nGo to the discussion to reply or catch up on the conversation: {{{message.url}}}",
            description: "Recipient has received a private message.",
        },
    ]
}
