//! Load, authorize, then write. A mutation goes `resolve` -> `Resolved::authorize` -> `Authorized`,
//! and only `Authorized` can update or delete, so a write cannot be issued before the
//! existence check and the authorization decision.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::guard::{authorize, Principal, Reason, Role};
use crate::database::schema::{Collection, Document};
use crate::database::store::Store;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Parses a path id. A malformed id can never match, so it is reported like a missing one.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::resource_not_found(raw))
}

fn reference(doc: &Document, field: &str) -> Option<Uuid> {
    doc.get(field).and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok())
}

/// A resource confirmed to exist, with its owner and parent chain.
#[derive(Debug, Clone)]
pub struct Resolved {
    collection: Collection,
    id: Uuid,
    owner: Option<Uuid>,
    parent: Option<Uuid>,
    document: Document,
}

/// Loads `raw_id` from `collection`. NotFound when it does not exist; no authorization runs here.
pub async fn resolve(store: &dyn Store, collection: Collection, raw_id: &str) -> Result<Resolved, ApiError> {
    let id = parse_id(raw_id)?;
    let document = store
        .find_by_id(collection, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No {} with the id of {}", collection.label(), id)))?;

    // Courses and reviews are owned by their own author, not by the parent bootcamp's owner
    let owner = reference(&document, "user");
    let parent = match collection {
        Collection::Courses | Collection::Reviews => reference(&document, "bootcamp"),
        _ => None,
    };
    Ok(Resolved { collection, id, owner, parent, document })
}

impl Resolved {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    /// Parent bootcamp of a course or review.
    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    fn deny(&self, principal: &Principal, reason: Reason, message: String) -> ApiError {
        warn!(
            "Denied {} {} to user {} ({:?})",
            self.collection.label(),
            self.id,
            principal.id,
            reason
        );
        match reason {
            Reason::RoleNotAllowed => ApiError::forbidden(format!(
                "User role {} is not authorized to access this route",
                principal.role
            )),
            _ => ApiError::unauthorized(message),
        }
    }

    /// Role gate (if `allowed` is given) then ownership gate.
    pub fn authorize(
        self,
        principal: &Principal,
        allowed: Option<&[Role]>,
        action: Action,
    ) -> Result<Authorized, ApiError> {
        let decision = authorize(principal, self.owner, allowed);
        if !decision.allow {
            let message = format!(
                "User {} is not authorized to {} this {}",
                principal.id,
                action.as_str(),
                self.collection.label()
            );
            return Err(self.deny(principal, decision.reason, message));
        }
        Ok(Authorized { resolved: self })
    }

    /// Gate for creating a `child` under this resource: the principal must own it or be an admin.
    pub fn authorize_child(
        &self,
        principal: &Principal,
        allowed: &[Role],
        child: Collection,
    ) -> Result<(), ApiError> {
        let decision = authorize(principal, self.owner, Some(allowed));
        if !decision.allow {
            let message = format!(
                "User {} is not authorized to add a {} to {} {}",
                principal.id,
                child.label(),
                self.collection.label(),
                self.id
            );
            return Err(self.deny(principal, decision.reason, message));
        }
        Ok(())
    }
}

/// A resolved resource the principal may mutate.
#[derive(Debug)]
pub struct Authorized {
    resolved: Resolved,
}

impl Authorized {
    pub fn id(&self) -> Uuid {
        self.resolved.id
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.resolved.parent
    }

    pub fn document(&self) -> &Document {
        &self.resolved.document
    }

    fn vanished(&self) -> ApiError {
        ApiError::not_found(format!(
            "No {} with the id of {}",
            self.resolved.collection.label(),
            self.resolved.id
        ))
    }

    /// Commits `changes`. NotFound if the resource was removed after it was resolved.
    pub async fn update(self, store: &dyn Store, changes: Document) -> Result<Document, ApiError> {
        store
            .update_by_id(self.resolved.collection, self.resolved.id, changes)
            .await?
            .ok_or_else(|| self.vanished())
    }

    pub async fn delete(self, store: &dyn Store) -> Result<Document, ApiError> {
        store
            .delete_by_id(self.resolved.collection, self.resolved.id)
            .await?
            .ok_or_else(|| self.vanished())
    }
}
