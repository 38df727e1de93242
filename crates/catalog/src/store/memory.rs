//! In-memory stores guarded by async read-write locks.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::sync::RwLock;

use super::{MovieStore, PermissionStore, StoreError, TokenStore, UserStore};
use crate::{
    filters::{Metadata, MovieQuery, SortColumn},
    movies::{Movie, NewMovie},
    permissions::Permissions,
    tokens::{Scope, Token, TokenHash},
    users::{NewUser, User},
};

struct Table<T> {
    last_id: u64,
    rows: BTreeMap<u64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Movies kept in process memory.
#[derive(Default)]
pub struct InMemoryMovieStore {
    table: RwLock<Table<Movie>>,
}

#[async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn insert(&self, movie: NewMovie) -> Result<Movie, StoreError> {
        let mut table = self.table.write().await;
        let id = table.next_id();

        let movie = Movie {
            id,
            created_at: Timestamp::now(),
            title: movie.title,
            year: movie.year,
            runtime: movie.runtime,
            genres: movie.genres,
            version: 1,
        };

        table.rows.insert(id, movie.clone());

        Ok(movie)
    }

    async fn get(&self, id: u64) -> Result<Movie, StoreError> {
        self.table.read().await.rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, mut movie: Movie) -> Result<Movie, StoreError> {
        let mut table = self.table.write().await;

        let Some(stored) = table.rows.get_mut(&movie.id) else {
            return Err(StoreError::EditConflict);
        };

        if stored.version != movie.version {
            return Err(StoreError::EditConflict);
        }

        movie.version += 1;
        *stored = movie.clone();

        Ok(movie)
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        match self.table.write().await.rows.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn list(&self, query: &MovieQuery) -> Result<(Vec<Movie>, Metadata), StoreError> {
        let table = self.table.read().await;
        let title = query.title.to_lowercase();

        let mut matches: Vec<&Movie> = table
            .rows
            .values()
            .filter(|movie| title.is_empty() || movie.title.to_lowercase().contains(&title))
            .filter(|movie| query.genres.iter().all(|genre| movie.genres.contains(genre)))
            .collect();

        let filters = &query.filters;

        matches.sort_by(|a, b| {
            let order = match filters.sort_column() {
                SortColumn::Id => a.id.cmp(&b.id),
                SortColumn::Title => a.title.cmp(&b.title),
                SortColumn::Year => a.year.cmp(&b.year),
                SortColumn::Runtime => a.runtime.cmp(&b.runtime),
            };

            let order = if filters.descending() { order.reverse() } else { order };

            match order {
                Ordering::Equal => a.id.cmp(&b.id),
                order => order,
            }
        });

        let metadata = Metadata::new(matches.len() as u64, filters);

        let page = matches
            .into_iter()
            .skip(usize::try_from(filters.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filters.page_size).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok((page, metadata))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.table.read().await.rows.len())
    }
}

/// Users kept in process memory.
#[derive(Default)]
pub struct InMemoryUserStore {
    table: RwLock<Table<User>>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write().await;

        if table.rows.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let id = table.next_id();

        let user = User {
            id,
            created_at: Timestamp::now(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            activated: user.activated,
            version: 1,
        };

        table.rows.insert(id, user.clone());

        Ok(user)
    }

    async fn get(&self, id: u64) -> Result<User, StoreError> {
        self.table.read().await.rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.table
            .read()
            .await
            .rows
            .values()
            .find(|user| user.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, mut user: User) -> Result<User, StoreError> {
        let mut table = self.table.write().await;

        if table
            .rows
            .values()
            .any(|existing| existing.id != user.id && existing.email == user.email)
        {
            return Err(StoreError::DuplicateEmail);
        }

        let Some(stored) = table.rows.get_mut(&user.id) else {
            return Err(StoreError::EditConflict);
        };

        if stored.version != user.version {
            return Err(StoreError::EditConflict);
        }

        user.version += 1;
        *stored = user.clone();

        Ok(user)
    }
}

struct StoredToken {
    user_id: u64,
    expiry: Timestamp,
    scope: Scope,
}

/// Token hashes kept in process memory.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<TokenHash, StoredToken>>,
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: &Token) -> Result<(), StoreError> {
        let stored = StoredToken {
            user_id: token.user_id,
            expiry: token.expiry,
            scope: token.scope,
        };

        self.tokens.write().await.insert(token.hash, stored);

        Ok(())
    }

    async fn find_user_id(&self, scope: Scope, hash: &TokenHash, now: Timestamp) -> Result<Option<u64>, StoreError> {
        let tokens = self.tokens.read().await;

        let user_id = tokens
            .get(hash)
            .filter(|token| token.scope == scope && token.expiry > now)
            .map(|token| token.user_id);

        Ok(user_id)
    }

    async fn delete_all_for_user(&self, scope: Scope, user_id: u64) -> Result<(), StoreError> {
        self.tokens
            .write()
            .await
            .retain(|_, token| !(token.scope == scope && token.user_id == user_id));

        Ok(())
    }
}

/// Permission grants kept in process memory.
#[derive(Default)]
pub struct InMemoryPermissionStore {
    grants: RwLock<HashMap<u64, Vec<String>>>,
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn for_user(&self, user_id: u64) -> Result<Permissions, StoreError> {
        let codes = self.grants.read().await.get(&user_id).cloned().unwrap_or_default();

        Ok(Permissions::new(codes))
    }

    async fn add_for_user(&self, user_id: u64, codes: &[&str]) -> Result<(), StoreError> {
        let mut grants = self.grants.write().await;
        let granted = grants.entry(user_id).or_default();

        for code in codes {
            if !granted.iter().any(|existing| existing == code) {
                granted.push(code.to_string());
            }
        }

        Ok(())
    }
}
