//! Per-fetch list loading state
//!
//! A [`ListLoader`] is the client-side primitive behind one admin list view
//! (applications, referrals). A `load` while another is in flight returns
//! immediately instead of queueing a second fetch. `detach` is called when
//! the view goes away; any fetch started before it finishes into the void.
//! A `load` future dropped mid-fetch releases the in-flight slot.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use crate::infra::Result;

/// Current state of the list
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Loaded(Vec<T>),
    Failed(String),
}

/// What a call to [`ListLoader::load`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    /// Another fetch was already running; nothing was started
    AlreadyLoading,
    /// The loader was detached while this fetch ran; its result was dropped
    Discarded,
    Failed(String),
}

struct Inner<T> {
    state: LoadState<T>,
    /// Bumped by `detach`; fetches from an older generation are discarded
    generation: u64,
}

pub struct ListLoader<T> {
    inner: Mutex<Inner<T>>,
}

/// Held across the fetch. Puts a still-`Loading` state of the same
/// generation back to `Idle` if the fetch never completes.
struct LoadingGuard<'a, T> {
    loader: &'a ListLoader<T>,
    ticket: u64,
    armed: bool,
}

impl<T> LoadingGuard<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.loader.lock();
        if inner.generation == self.ticket && matches!(inner.state, LoadState::Loading) {
            inner.state = LoadState::Idle;
        }
    }
}

impl<T> Default for ListLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ListLoader<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LoadState::Idle,
                generation: 0,
            }),
        }
    }

    // Never held across an await
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `fetch` unless a fetch is already in flight
    pub async fn load<F, Fut>(&self, fetch: F) -> LoadOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let guard = {
            let mut inner = self.lock();
            if matches!(inner.state, LoadState::Loading) {
                return LoadOutcome::AlreadyLoading;
            }
            inner.state = LoadState::Loading;
            LoadingGuard {
                loader: self,
                ticket: inner.generation,
                armed: true,
            }
        };

        let result = fetch().await;

        let ticket = guard.ticket;
        guard.disarm();

        let mut inner = self.lock();
        if inner.generation != ticket {
            return LoadOutcome::Discarded;
        }
        match result {
            Ok(items) => {
                let count = items.len();
                inner.state = LoadState::Loaded(items);
                LoadOutcome::Loaded { count }
            }
            Err(e) => {
                let message = e.to_string();
                inner.state = LoadState::Failed(message.clone());
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Drop the current state and orphan any in-flight fetch
    pub fn detach(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = LoadState::Idle;
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.lock().state, LoadState::Loading)
    }
}

impl<T: Clone> ListLoader<T> {
    pub fn state(&self) -> LoadState<T> {
        self.lock().state.clone()
    }

    /// Loaded items, if the last fetch succeeded
    pub fn items(&self) -> Option<Vec<T>> {
        match &self.lock().state {
            LoadState::Loaded(items) => Some(items.clone()),
            _ => None,
        }
    }
}
