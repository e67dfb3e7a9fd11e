//! Build number to protocol lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::protocol::Protocol;
use crate::schema::SchemaProtocol;
use crate::ProtocolError;

/// Build used for header decoding and as the fallback for unknown builds.
pub const DEFAULT_BUILD: u32 = 34835;

const DEFINITION_FILE: &str = r"^protocol(\d+)\.json$";

/// Outcome of resolving a replay's base build.
#[derive(Clone)]
pub struct Resolution {
    pub requested: u32,
    pub protocol: Arc<dyn Protocol>,
    /// The requested build is unknown and `protocol` is the default one.
    /// Output decoded with it is best effort.
    pub fallback: bool,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("requested", &self.requested)
            .field("protocol", &self.protocol.base_build())
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Protocols keyed by base build, with one designated default.
#[derive(Clone)]
pub struct ProtocolRegistry {
    protocols: BTreeMap<u32, Arc<dyn Protocol>>,
    default_build: u32,
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("builds", &self.protocols.keys().collect::<Vec<_>>())
            .field("default_build", &self.default_build)
            .finish()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD)
    }
}

impl ProtocolRegistry {
    pub fn new(default_build: u32) -> Self {
        Self {
            protocols: BTreeMap::new(),
            default_build,
        }
    }

    /// Registers a protocol under its base build, returning the one it
    /// replaces.
    pub fn register(&mut self, protocol: Arc<dyn Protocol>) -> Option<Arc<dyn Protocol>> {
        self.protocols.insert(protocol.base_build(), protocol)
    }

    pub fn set_default(&mut self, build: u32) {
        self.default_build = build;
    }

    pub fn default_build(&self) -> u32 {
        self.default_build
    }

    pub fn get(&self, build: u32) -> Option<Arc<dyn Protocol>> {
        self.protocols.get(&build).cloned()
    }

    /// Registered builds in ascending order.
    pub fn builds(&self) -> impl Iterator<Item = u32> + '_ {
        self.protocols.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    pub fn default_protocol(&self) -> Result<Arc<dyn Protocol>, ProtocolError> {
        self.get(self.default_build)
            .ok_or(ProtocolError::MissingDefault(self.default_build))
    }

    /// The protocol registered for exactly `build`.
    pub fn lookup(&self, build: u32) -> Result<Arc<dyn Protocol>, ProtocolError> {
        self.get(build)
            .ok_or(ProtocolError::UnsupportedProtocolVersion(build))
    }

    /// Picks the protocol for `build`, falling back to the default one with
    /// a warning when the build is unknown.
    ///
    /// Fails only when the default build itself is not registered.
    pub fn resolve(&self, build: u32) -> Result<Resolution, ProtocolError> {
        match self.lookup(build) {
            Ok(protocol) => {
                tracing::info!("Using protocol {}", build);
                Ok(Resolution {
                    requested: build,
                    protocol,
                    fallback: false,
                })
            }
            Err(unsupported @ ProtocolError::UnsupportedProtocolVersion(_)) => {
                let protocol = self.default_protocol()?;
                tracing::warn!(
                    "{}, decoding with protocol {}; output may be incomplete",
                    unsupported,
                    self.default_build
                );
                Ok(Resolution {
                    requested: build,
                    protocol,
                    fallback: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Loads every `protocol<BUILD>.json` definition in `dir`.
    ///
    /// Other files are ignored. The default build must be among the loaded
    /// definitions.
    pub fn load_dir(dir: &Path, default_build: u32) -> Result<Self, ProtocolError> {
        let io_err = |source| ProtocolError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let pattern = Regex::new(DEFINITION_FILE).expect("definition file pattern is valid");

        let mut definitions = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(build) = pattern
                .captures(name)
                .and_then(|c| c[1].parse::<u32>().ok())
            else {
                continue;
            };
            definitions.push((build, path));
        }
        definitions.sort();

        let mut registry = Self::new(default_build);
        for (build, path) in definitions {
            let protocol = SchemaProtocol::load(build, &path)?;
            tracing::debug!("Loaded protocol {} from {}", build, path.display());
            registry.register(Arc::new(protocol));
        }
        registry.default_protocol()?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EventStream;
    use crate::DecodeError;
    use hots_lambda_value::Node;
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    struct Fixed(u32);

    impl Protocol for Fixed {
        fn base_build(&self) -> u32 {
            self.0
        }

        fn decode_header(&self, _: &[u8]) -> Result<Node, DecodeError> {
            Ok(Node::object())
        }

        fn decode_details(&self, _: &[u8]) -> Result<Node, DecodeError> {
            Ok(Node::object())
        }

        fn decode_init_data(&self, _: &[u8]) -> Result<Node, DecodeError> {
            Ok(Node::object())
        }

        fn decode_game_events<'a>(&'a self, _: &'a [u8]) -> EventStream<'a> {
            Box::new(std::iter::empty())
        }

        fn decode_message_events<'a>(&'a self, _: &'a [u8]) -> EventStream<'a> {
            Box::new(std::iter::empty())
        }
    }

    /// Log sink shared between a test and its subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn registry() -> ProtocolRegistry {
        let mut registry = ProtocolRegistry::new(34835);
        registry.register(Arc::new(Fixed(34835)));
        registry.register(Arc::new(Fixed(39153)));
        registry
    }

    #[test]
    fn exact_build_is_not_a_fallback() {
        let resolution = registry().resolve(39153).unwrap();
        assert_eq!(resolution.protocol.base_build(), 39153);
        assert!(!resolution.fallback);
    }

    #[test]
    fn unknown_build_falls_back_to_default() {
        let resolution = registry().resolve(99999).unwrap();
        assert_eq!(resolution.requested, 99999);
        assert_eq!(resolution.protocol.base_build(), 34835);
        assert!(resolution.fallback);
    }

    #[test]
    fn lookup_reports_unsupported_build() {
        assert!(matches!(
            registry().lookup(99999),
            Err(ProtocolError::UnsupportedProtocolVersion(99999))
        ));
        assert_eq!(registry().lookup(34835).unwrap().base_build(), 34835);
    }

    #[test]
    fn fallback_warning_names_the_build() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        let resolution =
            tracing::subscriber::with_default(subscriber, || registry().resolve(99999)).unwrap();
        assert!(resolution.fallback);

        let log = captured.text();
        assert!(log.contains("WARN"), "{log}");
        assert!(log.contains("unsupported base build 99999"), "{log}");
        assert!(log.contains("decoding with protocol 34835"), "{log}");
    }

    #[test]
    fn exact_match_logs_no_warning() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || registry().resolve(39153)).unwrap();
        assert!(!captured.text().contains("WARN"));
    }

    #[test]
    fn missing_default_is_an_error() {
        let mut registry = registry();
        registry.set_default(1);
        assert!(matches!(
            registry.resolve(2),
            Err(ProtocolError::MissingDefault(1))
        ));
        // exact matches still resolve
        assert!(registry.resolve(39153).is_ok());
    }

    #[test]
    fn builds_are_sorted() {
        let builds: Vec<_> = registry().builds().collect();
        assert_eq!(builds, vec![34835, 39153]);
        assert!(registry().get(1).is_none());
    }

    #[test]
    fn definition_file_names() {
        let pattern = Regex::new(DEFINITION_FILE).unwrap();
        assert!(pattern.is_match("protocol34835.json"));
        assert!(!pattern.is_match("protocol.json"));
        assert!(!pattern.is_match("protocol34835.json.bak"));
        assert!(!pattern.is_match("xprotocol1.json"));
    }
}
