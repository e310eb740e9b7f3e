//! Wildcard trie over hostname tokens.
//!
//! Each node owns its children, so the whole tree is owned by the root and
//! contains no cycles. A node carries at most one payload.
//!
//! Lookup descends literal tokens first. On the first token with no literal
//! child, the wildcard child of that node (if any) absorbs the rest of the
//! tokens; otherwise the lookup misses. Tokens run from the TLD inward, so the
//! wildcard reached is the most specific one for the remaining path
//! (`*.us-east.example.com` beats `*.example.com` beats `*.com` beats `*`).
//!
//! A wildcard only absorbs segments that remain after its parent, so
//! `*.example.com` never matches `example.com` itself. A wildcard higher up the
//! path is not consulted once a literal token has matched below it.

use std::collections::HashMap;

use crate::routing::error::{RouteError, RouteResult};

#[derive(Debug, Clone)]
struct TrieNode<T> {
    children: HashMap<String, TrieNode<T>>,
    payload: Option<T>,
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            payload: None,
        }
    }
}

/// Prefix tree keyed by token sequences with single-token wildcard fallback.
#[derive(Debug, Clone)]
pub struct WildcardTrie<T> {
    root: TrieNode<T>,
    wildcard: String,
}

impl<T> WildcardTrie<T> {
    /// Create an empty trie using `wildcard` as the wildcard token.
    pub fn new(wildcard: impl Into<String>) -> Self {
        Self {
            root: TrieNode::default(),
            wildcard: wildcard.into(),
        }
    }

    /// Store `payload` at the node addressed by `tokens`.
    ///
    /// Intermediate nodes are created as needed. Fails if the terminal node
    /// already holds a payload.
    pub fn add<I, S>(&mut self, tokens: I, payload: T) -> RouteResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Vec::new();
        let node = self.walk_mut(tokens, |token| path.push(token.to_string()));

        if node.payload.is_some() {
            return Err(RouteError::DuplicateRoute(path.join(".")));
        }
        node.payload = Some(payload);
        Ok(())
    }

    /// Payload at exactly `tokens`, creating the node and payload if absent.
    pub fn get_or_insert_with<I, S, F>(&mut self, tokens: I, f: F) -> &mut T
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnOnce() -> T,
    {
        self.walk_mut(tokens, |_| {}).payload.get_or_insert_with(f)
    }

    /// Payload stored at exactly `tokens`, without wildcard fallback.
    pub fn get<I, S>(&self, tokens: I) -> Option<&T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = &self.root;
        for token in tokens {
            node = node.children.get(token.as_ref())?;
        }
        node.payload.as_ref()
    }

    /// Most specific payload matching `tokens`.
    pub fn find<I, S>(&self, tokens: I) -> Option<&T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = &self.root;
        for token in tokens {
            match node.children.get(token.as_ref()) {
                Some(child) => node = child,
                // The wildcard absorbs this token and everything after it.
                None => return self.wildcard_payload(node),
            }
        }
        node.payload.as_ref()
    }

    /// Whether the trie holds no payloads.
    pub fn is_empty(&self) -> bool {
        fn empty<T>(node: &TrieNode<T>) -> bool {
            node.payload.is_none() && node.children.values().all(|child| empty(child))
        }
        empty(&self.root)
    }

    fn wildcard_payload<'a>(&self, node: &'a TrieNode<T>) -> Option<&'a T> {
        node.children
            .get(&self.wildcard)
            .and_then(|child| child.payload.as_ref())
    }

    fn walk_mut<I, S>(&mut self, tokens: I, mut visit: impl FnMut(&str)) -> &mut TrieNode<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = &mut self.root;
        for token in tokens {
            let token = token.as_ref();
            visit(token);
            node = node.children.entry(token.to_string()).or_default();
        }
        node
    }
}
