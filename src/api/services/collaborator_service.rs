//! Collaborator resolution.
//!
//! Turns a comma-separated list of emails into collaborator links on a
//! session, creating email-only placeholder users for addresses nobody has
//! registered yet.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use crate::models::{CollaboratorView, User};
use crate::storage::{StorageBackend, StorageTransaction};

/// Split on `,`, trim each entry and drop blanks. Case is kept as given.
pub fn parse_collaborator_emails(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Distinct entries in order of first appearance.
fn distinct(emails: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    emails
        .iter()
        .filter(|e| seen.insert(e.as_str()))
        .cloned()
        .collect()
}

fn preference(user: &User) -> (bool, bool, i64) {
    (user.password_hash.is_none(), user.name.is_none(), user.id)
}

/// Pick one user per email, with the same preference as a lookup by email.
fn index_by_email(users: Vec<User>) -> HashMap<String, i64> {
    let mut best: HashMap<String, User> = HashMap::new();
    for user in users {
        let replace = match best.get(&user.email) {
            Some(current) => preference(&user) < preference(current),
            None => true,
        };
        if replace {
            best.insert(user.email.clone(), user);
        }
    }
    best.into_iter().map(|(email, u)| (email, u.id)).collect()
}

/// Link every email to `session_id` inside an open transaction and return the
/// linked user ids, one per distinct email, in first-appearance order.
pub async fn link_collaborators(
    tx: &mut dyn StorageTransaction,
    session_id: i64,
    emails: &[String],
) -> ServiceResult<Vec<i64>> {
    if !tx.session_exists(session_id).await? {
        return Err(ServiceError::invalid_field(
            "session_id",
            "Session does not exist.",
        ));
    }

    let emails = distinct(emails);
    if emails.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids = index_by_email(tx.find_users_by_emails(&emails).await?);

    let missing: Vec<String> = emails
        .iter()
        .filter(|e| !ids.contains_key(e.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        let created = tx.create_placeholder_users(&missing).await?;
        debug!(
            "Created {} placeholder users for session {}",
            created.len(),
            session_id
        );
        for user in created {
            ids.insert(user.email, user.id);
        }
    }

    let mut seen = HashSet::new();
    let user_ids: Vec<i64> = emails
        .iter()
        .filter_map(|e| ids.get(e.as_str()).copied())
        .filter(|id| seen.insert(*id))
        .collect();

    tx.create_session_collaborators(session_id, &user_ids).await?;
    info!(
        "Linked {} collaborators to session {}",
        user_ids.len(),
        session_id
    );

    Ok(user_ids)
}

/// Resolve `email_list` into collaborator links for an existing session in
/// one transaction, then return the session's full collaborator list.
///
/// Running it twice with the same list links each user twice.
pub async fn resolve_and_link_collaborators(
    storage: &dyn StorageBackend,
    session_id: i64,
    email_list: &str,
) -> ServiceResult<Vec<CollaboratorView>> {
    let emails = parse_collaborator_emails(email_list);

    let mut tx = storage.begin().await?;
    let linked = link_collaborators(tx.as_mut(), session_id, &emails).await?;
    if linked.is_empty() {
        drop(tx);
    } else {
        tx.commit().await?;
    }

    Ok(storage.list_session_collaborators(session_id).await?)
}

/// Split a flat batch result back into one list per entry of `session_ids`.
pub fn group_by_session(
    session_ids: &[i64],
    rows: Vec<CollaboratorView>,
) -> Vec<Vec<CollaboratorView>> {
    let index: HashMap<i64, usize> = session_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    let mut grouped = vec![Vec::new(); session_ids.len()];
    for row in rows {
        if let Some(&i) = index.get(&row.session_id) {
            grouped[i].push(row);
        }
    }
    grouped
}
