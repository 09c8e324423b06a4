//! Signals, slots and their connections
//!
//! Each wrapped instance gets a method table seeded from its type's
//! declared signals and slots. Signals and slots added at runtime are
//! appended to that table and flagged dynamic. Connections tie a signal of
//! one instance to a script receiver and live until the instance is
//! deregistered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use sigbridge_sdk::{NativeHandle, NativeValue, ScriptFunction};

use crate::config::BridgeConfig;
use crate::converter::ConverterRegistry;
use crate::error::{BridgeError, BridgeResult};
use crate::metacall::call_script_method;
use crate::object::Instance;

/// Signal or slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Notification emitted by an object
    Signal,
    /// Invokable receiver
    Slot,
}

/// A signal or slot declared by its normalized signature `name(T1,T2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaMethod {
    signature: String,
    name: String,
    parameter_types: Vec<String>,
    return_type: Option<String>,
    kind: MethodKind,
    dynamic: bool,
}

impl MetaMethod {
    /// Parse a signal signature
    pub fn signal(signature: &str) -> BridgeResult<Self> {
        Self::parse(signature, MethodKind::Signal)
    }

    /// Parse a slot signature
    pub fn slot(signature: &str) -> BridgeResult<Self> {
        Self::parse(signature, MethodKind::Slot)
    }

    /// Parse `name(T1, T2)`; whitespace around types is dropped.
    pub fn parse(signature: &str, kind: MethodKind) -> BridgeResult<Self> {
        let syntax = |reason: &str| BridgeError::SignatureSyntax {
            line: signature.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = signature.trim();
        let (name, rest) = trimmed.split_once('(').ok_or_else(|| syntax("missing '('"))?;
        let args = rest.strip_suffix(')').ok_or_else(|| syntax("missing ')'"))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(syntax("invalid method name"));
        }
        let parameter_types = split_type_list(args).ok_or_else(|| syntax("unbalanced brackets"))?;
        Ok(Self {
            signature: format!("{}({})", name, parameter_types.join(",")),
            name: name.to_string(),
            parameter_types,
            return_type: None,
            kind,
            dynamic: false,
        })
    }

    /// Set the declared return type
    pub fn with_return_type(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }

    /// Normalized signature
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter type names
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// Return type name
    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    /// Signal or slot
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// Registered at runtime rather than declared on the type
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Split a parameter type list at top-level commas. Template arguments
/// (`QMap<QString, int>`) stay in one entry; whitespace next to `<`, `>`
/// and `,` is dropped. `None` when brackets do not balance.
fn split_type_list(args: &str) -> Option<Vec<String>> {
    let mut types = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for ch in args.chars() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                types.push(normalize_type(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if depth != 0 {
        return None;
    }
    types.push(normalize_type(&current));
    types.retain(|t| !t.is_empty());
    Some(types)
}

fn normalize_type(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        let glue = matches!(ch, '<' | '>' | ',') || out.ends_with(['<', '>', ',']);
        if pending_space && !glue {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

/// Identifies one connection for later disconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

struct Connection {
    id: ConnectionId,
    signal: usize,
    receiver: Arc<ScriptFunction>,
}

struct Channels {
    class_name: String,
    methods: Vec<MetaMethod>,
    connections: Vec<Connection>,
}

impl Channels {
    fn index_of(&self, signature: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.signature == signature)
    }
}

/// Per-instance signal/slot tables and connections
pub struct SignalManager {
    channels: DashMap<NativeHandle, Channels>,
    next_connection: AtomicU64,
    config: BridgeConfig,
}

impl SignalManager {
    /// Create a manager
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            channels: DashMap::new(),
            next_connection: AtomicU64::new(1),
            config,
        }
    }

    /// Table of a live instance, created on first write
    fn channels_mut(&self, instance: &Instance) -> BridgeResult<RefMut<'_, NativeHandle, Channels>> {
        if !instance.is_live() {
            return Err(BridgeError::UnknownInstance {
                handle: instance.handle().to_string(),
            });
        }
        Ok(self.channels.entry(instance.handle()).or_insert_with(|| Channels {
            class_name: instance.native_type().name().to_string(),
            methods: instance.native_type().meta_methods(),
            connections: Vec::new(),
        }))
    }

    /// Read the instance's table. Instances without a table read their
    /// type's declared methods; nothing is inserted.
    fn read_channels<R>(&self, instance: &Instance, f: impl FnOnce(&[MetaMethod], &[Connection]) -> R) -> R {
        match self.channels.get(&instance.handle()) {
            Some(channels) if instance.is_live() => f(&channels.methods, &channels.connections),
            _ => f(&instance.native_type().meta_methods(), &[]),
        }
    }

    /// Index of `method` in the instance's table, appending it as dynamic
    /// when absent. Fails for released instances.
    pub fn register_meta_method(&self, instance: &Instance, method: MetaMethod) -> BridgeResult<usize> {
        let mut channels = self.channels_mut(instance)?;
        if let Some(index) = channels.index_of(&method.signature) {
            return Ok(index);
        }
        if method.kind == MethodKind::Slot && self.config.slot_warnings() {
            log::warn!(
                target: "sigbridge::slots",
                "Registering dynamic slot \"{}\" on \"{}\". Consider annotating with @Slot()",
                method.signature,
                channels.class_name
            );
        }
        channels.methods.push(MetaMethod {
            dynamic: true,
            ..method
        });
        Ok(channels.methods.len() - 1)
    }

    /// Index of a signature in the instance's table
    pub fn method_index(&self, instance: &Instance, signature: &str) -> Option<usize> {
        let normalized = MetaMethod::parse(signature, MethodKind::Signal).ok()?;
        self.read_channels(instance, |methods, _| {
            methods.iter().position(|m| m.signature == normalized.signature)
        })
    }

    /// Method at an index
    pub fn method(&self, instance: &Instance, index: usize) -> Option<MetaMethod> {
        self.read_channels(instance, |methods, _| methods.get(index).cloned())
    }

    /// Number of signals and slots known for the instance
    pub fn method_count(&self, instance: &Instance) -> usize {
        self.read_channels(instance, |methods, _| methods.len())
    }

    /// Number of instances with a signal table
    pub fn table_count(&self) -> usize {
        self.channels.len()
    }

    /// Connect a signal to a receiver. Unknown signals are registered
    /// as dynamic signals.
    pub fn connect(&self, instance: &Instance, signal: &str, receiver: ScriptFunction) -> BridgeResult<ConnectionId> {
        let method = MetaMethod::signal(signal)?;
        let index = self.register_meta_method(instance, method)?;
        let mut channels = self.channels_mut(instance)?;
        if channels.methods[index].kind != MethodKind::Signal {
            return Err(BridgeError::CallFailed {
                callable: channels.methods[index].signature.clone(),
                message: "cannot connect to a slot".to_string(),
            });
        }
        let id = ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed));
        channels.connections.push(Connection {
            id,
            signal: index,
            receiver: Arc::new(receiver),
        });
        Ok(id)
    }

    /// Remove a connection. Returns false if it was not found.
    pub fn disconnect(&self, handle: NativeHandle, id: ConnectionId) -> bool {
        let Some(mut channels) = self.channels.get_mut(&handle) else {
            return false;
        };
        let before = channels.connections.len();
        channels.connections.retain(|c| c.id != id);
        channels.connections.len() != before
    }

    /// Number of live connections of an instance
    pub fn connection_count(&self, handle: NativeHandle) -> usize {
        self.channels
            .get(&handle)
            .map(|c| c.connections.len())
            .unwrap_or(0)
    }

    /// Emit a signal by signature. Returns the number of receivers called.
    pub fn emit(
        &self,
        instance: &Instance,
        signal: &str,
        slots: &mut [NativeValue],
        converters: &ConverterRegistry,
    ) -> BridgeResult<usize> {
        let index = self
            .method_index(instance, signal)
            .ok_or_else(|| BridgeError::CallFailed {
                callable: signal.to_string(),
                message: format!("no such signal on {}", instance.native_type().name()),
            })?;
        self.emit_index(instance, index, slots, converters)
    }

    /// Emit the signal at `index`. Slot 0 is unused, arguments start at 1.
    pub fn emit_index(
        &self,
        instance: &Instance,
        index: usize,
        slots: &mut [NativeValue],
        converters: &ConverterRegistry,
    ) -> BridgeResult<usize> {
        // Receivers run without the table lock so they may connect or emit
        let (method, receivers) = self.read_channels(instance, |methods, connections| {
            let receivers: Vec<Arc<ScriptFunction>> = connections
                .iter()
                .filter(|c| c.signal == index)
                .map(|c| c.receiver.clone())
                .collect();
            (methods.get(index).cloned(), receivers)
        });
        let method = method.ok_or_else(|| BridgeError::CallFailed {
            callable: format!("#{}", index),
            message: format!("no meta-method at index {}", index),
        })?;
        for receiver in &receivers {
            call_script_method(receiver, None, &method, slots, converters).into_result(&method)?;
        }
        Ok(receivers.len())
    }

    /// Drop every method and connection of an instance
    pub fn deregister(&self, handle: NativeHandle) -> bool {
        self.channels.remove(&handle).is_some()
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}
