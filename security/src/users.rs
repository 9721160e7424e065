// security/src/users.rs

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use lib::database::{Database, Repository};
use lib::storage_engine::{Query, SortOrder};
use models::errors::{ClinicError, ClinicResult};
use models::labels::Labeled;
use models::medical::{Login, NewUser, PublicUser, Role, User};
use models::{DocumentId, Stored, Validate};

use crate::{AuthError, Claims, TokenIssuer, hash_password, verify_password};

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: PublicUser,
}

/// Accounts on the `users` collection. An account's document id is derived
/// from its normalized email, so two registrations of one address collide in
/// the store instead of producing duplicates.
#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
    tokens: TokenIssuer,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn user_id_for(email: &str) -> DocumentId {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, normalize_email(email).as_bytes());
    DocumentId::try_from(id.simple().to_string()).unwrap_or_else(|_| DocumentId::unique())
}

impl UserService {
    pub fn new(db: &Database, tokens: TokenIssuer) -> Self {
        UserService {
            users: db.repository::<User>(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Registers a patient account.
    pub async fn register(&self, input: &NewUser) -> ClinicResult<Stored<User>> {
        self.register_with_role(input, Role::Patient).await
    }

    pub async fn register_with_role(&self, input: &NewUser, role: Role) -> ClinicResult<Stored<User>> {
        input.validate()?;
        let email = normalize_email(&input.email);
        let user = User {
            password_hash: hash_password(&input.password)?,
            display_name: input.display_name.trim().to_string(),
            email: email.clone(),
            role,
        };
        match self.users.create_with_id(Some(user_id_for(&email)), &user).await {
            Ok(stored) => {
                info!("Registered {} account {}", role.label(), stored.id);
                Ok(stored)
            }
            Err(ClinicError::AlreadyExists(_)) => Err(ClinicError::AlreadyExists(format!(
                "an account for {} already exists",
                email
            ))),
            Err(e) => Err(e),
        }
    }

    /// Creates the administrator account unless one with this email exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ClinicResult<Stored<User>> {
        if let Some(existing) = self.users.find(&user_id_for(email)).await? {
            if existing.record.role != Role::Admin {
                warn!("bootstrap admin {} exists with role {}", existing.id, existing.record.role);
            }
            return Ok(existing);
        }
        let input = NewUser {
            email: email.to_string(),
            display_name: "Administrator".to_string(),
            password: password.to_string(),
        };
        self.register_with_role(&input, Role::Admin).await
    }

    pub async fn login(&self, login: &Login) -> ClinicResult<Session> {
        let user = self
            .users
            .find(&user_id_for(&login.email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&login.password, &user.record.password_hash)? {
            warn!("failed login for account {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }
        let token = self.tokens.issue(&user.id, user.record.role)?;
        Ok(Session {
            token,
            user: PublicUser::from(&user),
        })
    }

    /// Resolves a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> ClinicResult<Stored<User>> {
        let claims = self.tokens.verify(token)?;
        self.current_user(&claims).await
    }

    /// The account behind verified claims. Deleted accounts are rejected.
    pub async fn current_user(&self, claims: &Claims) -> ClinicResult<Stored<User>> {
        match self.users.get(&claims.sub).await {
            Ok(user) => Ok(user),
            Err(e) if e.is_not_found() => {
                Err(ClinicError::Unauthorized("account no longer exists".to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get(&self, id: &DocumentId) -> ClinicResult<Stored<User>> {
        self.users.get(id).await
    }

    /// Administrator accounts, which patients can open chats with.
    pub async fn admins(&self) -> ClinicResult<Vec<PublicUser>> {
        let query = Query::new()
            .equal("role", Role::Admin.index())
            .order_by("display_name", SortOrder::Asc);
        let page = self.users.list(&query).await?;
        Ok(page.items.iter().map(PublicUser::from).collect())
    }
}
