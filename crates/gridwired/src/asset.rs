//! Asset namespace served by the daemon.
//!
//! Assets form a tree keyed by name. Each asset carries at most one view
//! binding, which produces a fresh [`DocumentHandler`] for every connection
//! that addresses the asset. Parent links are weak and only used to render
//! full paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use gridwire_config::{AssetKind, AssetSpec};
use gridwire_views::{IndexedLog, IndexedTopicLog, TopicChannel, TopicHub, ViewHandle, ViewKind};
use gridwire_wire::WireAdapter;

use crate::dispatch::{DocumentHandler, TopicDispatcher};
use crate::outbound::OutboundPublisher;

const ASSET_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::asset");

/// Errors raised while building the asset tree.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The path was relative or contained an empty segment.
    #[error("invalid asset path '{path}'")]
    InvalidPath {
        /// Offending path.
        path: String,
    },
    /// The asset already has a view attached.
    #[error("asset '{path}' already has a view attached")]
    AlreadyBound {
        /// Asset path.
        path: String,
    },
}

/// A view attached to an asset, ready to be bound to connections.
pub trait ViewBinding: Send + Sync {
    /// Kind of the attached view.
    fn kind(&self) -> ViewKind;

    /// Creates the handler serving this asset on one connection.
    fn bind(&self, publisher: Arc<OutboundPublisher>) -> Box<dyn DocumentHandler>;

    /// Closes the view, ending every subscription on it.
    fn close(&self);
}

/// Binding over a typed view and the adapter that decodes its parameters.
pub struct TopicBinding<T, M> {
    view: ViewHandle<T, M>,
    adapter: WireAdapter<T, M>,
}

impl<T, M> TopicBinding<T, M> {
    /// Pairs a view with its codec adapter.
    pub fn new(view: ViewHandle<T, M>, adapter: WireAdapter<T, M>) -> Self {
        Self { view, adapter }
    }
}

impl<T, M> ViewBinding for TopicBinding<T, M>
where
    T: Serialize + Send + Sync + 'static,
    M: Serialize + Send + Sync + 'static,
{
    fn kind(&self) -> ViewKind {
        self.view.kind()
    }

    fn bind(&self, publisher: Arc<OutboundPublisher>) -> Box<dyn DocumentHandler> {
        Box::new(TopicDispatcher::new(
            self.view.clone(),
            self.adapter.clone(),
            publisher,
        ))
    }

    fn close(&self) {
        self.view.close();
    }
}

/// Builds the JSON-typed binding described by `spec`.
pub fn json_binding(spec: &AssetSpec) -> Arc<dyn ViewBinding> {
    let view: ViewHandle<String, Value> = match spec.kind {
        AssetKind::Topic => {
            ViewHandle::Topic(Arc::new(TopicHub::<String, Value>::new())
                as Arc<dyn TopicChannel<String, Value>>)
        }
        AssetKind::Indexed => ViewHandle::Indexed(Arc::new(
            IndexedTopicLog::<String, Value>::with_start_index(spec.start_index),
        ) as Arc<dyn IndexedLog<String, Value>>),
    };
    Arc::new(TopicBinding::new(view, WireAdapter::json()))
}

/// Node of the asset tree.
pub struct Asset {
    name: String,
    parent: Weak<Asset>,
    children: RwLock<HashMap<String, Arc<Asset>>>,
    binding: RwLock<Option<Arc<dyn ViewBinding>>>,
}

impl Asset {
    fn root() -> Arc<Self> {
        Self::with_parent(String::new(), Weak::new())
    }

    fn with_parent(name: String, parent: Weak<Self>) -> Arc<Self> {
        Arc::new(Self {
            name,
            parent,
            children: RwLock::new(HashMap::new()),
            binding: RwLock::new(None),
        })
    }

    /// Name of this node; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slash-separated path from the root; `/` for the root itself.
    pub fn full_name(&self) -> String {
        let mut segments = vec![self.name.clone()];
        let mut next = self.parent.upgrade();
        while let Some(parent) = next {
            segments.push(parent.name.clone());
            next = parent.parent.upgrade();
        }
        segments.reverse();
        let path = segments.join("/");
        if path.is_empty() { "/".to_owned() } else { path }
    }

    /// Returns the child called `name`, creating it if needed.
    pub fn acquire_child(self: &Arc<Self>, name: &str) -> Arc<Self> {
        if let Some(child) = self.get_child(name) {
            return child;
        }
        let mut children = write(&self.children);
        Arc::clone(
            children
                .entry(name.to_owned())
                .or_insert_with(|| Self::with_parent(name.to_owned(), Arc::downgrade(self))),
        )
    }

    /// Returns the child called `name`, if any.
    pub fn get_child(&self, name: &str) -> Option<Arc<Self>> {
        read(&self.children).get(name).cloned()
    }

    /// Attaches a view binding.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::AlreadyBound`] if a binding is already attached.
    pub fn attach(&self, binding: Arc<dyn ViewBinding>) -> Result<(), AssetError> {
        let mut slot = write(&self.binding);
        if slot.is_some() {
            return Err(AssetError::AlreadyBound {
                path: self.full_name(),
            });
        }
        *slot = Some(binding);
        Ok(())
    }

    /// The attached binding, if any.
    pub fn binding(&self) -> Option<Arc<dyn ViewBinding>> {
        read(&self.binding).clone()
    }

    fn close(&self) {
        if let Some(binding) = self.binding() {
            binding.close();
        }
        let children: Vec<Arc<Self>> = read(&self.children).values().cloned().collect();
        for child in children {
            child.close();
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Asset")
            .field("path", &self.full_name())
            .field("kind", &self.binding().map(|binding| binding.kind()))
            .finish_non_exhaustive()
    }
}

/// Rooted tree of assets.
#[derive(Debug)]
pub struct AssetTree {
    root: Arc<Asset>,
}

impl AssetTree {
    /// Creates a tree holding only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Asset::root(),
        }
    }

    /// Builds a tree with a JSON-typed view mounted for every spec.
    ///
    /// # Errors
    ///
    /// Fails like [`AssetTree::mount`].
    pub fn from_specs(specs: &[AssetSpec]) -> Result<Self, AssetError> {
        let tree = Self::new();
        for spec in specs {
            tree.mount(&spec.path, json_binding(spec))?;
        }
        Ok(tree)
    }

    /// Root node.
    pub fn root(&self) -> &Arc<Asset> {
        &self.root
    }

    /// Creates the asset at `path` and attaches `binding` to it.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidPath`] or [`AssetError::AlreadyBound`].
    pub fn mount(
        &self,
        path: &str,
        binding: Arc<dyn ViewBinding>,
    ) -> Result<Arc<Asset>, AssetError> {
        let asset = self.acquire_asset(path)?;
        let kind = binding.kind();
        asset.attach(binding)?;
        info!(target: ASSET_TARGET, path, %kind, "asset mounted");
        Ok(asset)
    }

    /// Returns the asset at `path`, creating missing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidPath`] unless `path` is absolute with
    /// non-empty segments.
    pub fn acquire_asset(&self, path: &str) -> Result<Arc<Asset>, AssetError> {
        let invalid = || AssetError::InvalidPath {
            path: path.to_owned(),
        };
        let relative = path.strip_prefix('/').ok_or_else(invalid)?;
        if relative.is_empty() || relative.split('/').any(str::is_empty) {
            return Err(invalid());
        }
        Ok(relative
            .split('/')
            .fold(Arc::clone(&self.root), |node, name| node.acquire_child(name)))
    }

    /// Resolves `path` to an existing asset. Empty segments are ignored.
    pub fn get_asset(&self, path: &str) -> Option<Arc<Asset>> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(Arc::clone(&self.root), |node, name| node.get_child(name))
    }

    /// Closes every mounted view.
    pub fn close(&self) {
        self.root.close();
    }
}

impl Default for AssetTree {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
