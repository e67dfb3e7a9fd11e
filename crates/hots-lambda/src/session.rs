//! Decode session for one replay.
//!
//! A session reads the header with the default protocol, resolves the
//! replay's base build, then decodes each requested category in a fixed
//! order and writes one lambda log line per record.

use std::io::{self, Write};

use hots_lambda_log::{flatten_with, write_lambda_line, EventStats, FlattenOptions};
use hots_lambda_protocol::{DecodeError, Protocol, ProtocolError, ProtocolRegistry};
use hots_lambda_value::Node;

use crate::{Category, Container, ContainerError, SessionError};

/// What a session should produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Categories to emit lines for. Order does not matter.
    pub categories: Vec<Category>,
    /// Print the per event kind summary to the diagnostic writer.
    pub stats: bool,
}

impl Request {
    pub fn all() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            stats: false,
        }
    }

    /// Only the stats summary; event streams are decoded but not printed.
    pub fn stats_only() -> Self {
        Self {
            categories: Vec::new(),
            stats: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && !self.stats
    }

    /// Categories to decode, in output order, each with whether its records
    /// are printed. Stats always cover every event stream, printed or not.
    fn plan(&self) -> Vec<(Category, bool)> {
        Category::ALL
            .into_iter()
            .filter_map(|category| {
                let emit = self.categories.contains(&category);
                let count = self.stats && category.is_event_stream();
                (emit || count).then_some((category, emit))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub flatten: FlattenOptions,
    /// Record decode failures per category instead of aborting.
    pub keep_going: bool,
}

/// A category that failed to decode in a keep-going session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFailure {
    pub category: Category,
    pub error: DecodeError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Base build declared by the replay header.
    pub base_build: u32,
    /// Build of the protocol that decoded the replay.
    pub protocol_build: u32,
    /// The declared build was unknown; output came from the default protocol.
    pub fallback: bool,
    /// Lines written to the primary output.
    pub lines: u64,
    pub failures: Vec<CategoryFailure>,
}

pub struct Session<'r> {
    registry: &'r ProtocolRegistry,
    options: SessionOptions,
    stats: EventStats,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r ProtocolRegistry, options: SessionOptions) -> Self {
        Self {
            registry,
            options,
            stats: EventStats::new(),
        }
    }

    pub fn stats(&self) -> &EventStats {
        &self.stats
    }

    pub fn into_stats(self) -> EventStats {
        self.stats
    }

    /// Decodes `container` as requested. Lines go to `out`, the stats
    /// summary to `diag`.
    pub fn run<C, W, E>(
        &mut self,
        container: &C,
        request: &Request,
        out: &mut W,
        diag: &mut E,
    ) -> Result<SessionReport, SessionError>
    where
        C: Container + ?Sized,
        W: Write + ?Sized,
        E: Write + ?Sized,
    {
        let header_bytes = container.read(Category::Header)?;
        let header = self
            .registry
            .default_protocol()?
            .decode_header(&header_bytes)
            .map_err(|source| SessionError::Decode {
                category: Category::Header,
                source,
            })?;
        let base_build = header
            .pointer(&["m_version", "m_baseBuild"])
            .and_then(Node::as_u64)
            .and_then(|build| u32::try_from(build).ok())
            .ok_or(SessionError::MissingBaseBuild)?;

        let resolution = self.registry.resolve(base_build)?;
        let protocol = resolution.protocol.as_ref();
        let mut report = SessionReport {
            base_build,
            protocol_build: protocol.base_build(),
            fallback: resolution.fallback,
            lines: 0,
            failures: Vec::new(),
        };

        let mut header = Some(header);
        for (category, emit) in request.plan() {
            let mut sink = Sink {
                out: &mut *out,
                options: &self.options.flatten,
                stats: request.stats.then_some(&mut self.stats),
                emit,
                lines: 0,
            };
            let outcome = match category {
                Category::Header => match header.take() {
                    Some(header) => sink.record(header).map_err(Failure::Output),
                    None => Ok(()),
                },
                _ => decode_category(protocol, container, category, &mut sink),
            };
            report.lines += sink.lines;
            tracing::debug!("{}: {} lines", category, sink.lines);

            match outcome {
                Ok(()) => {}
                Err(Failure::Decode(error)) if self.options.keep_going => {
                    tracing::warn!("Skipping {}: {}", category, error);
                    report.failures.push(CategoryFailure { category, error });
                }
                Err(Failure::Decode(source)) => {
                    return Err(SessionError::Decode { category, source })
                }
                Err(Failure::Container(err)) => return Err(err.into()),
                Err(Failure::Protocol(err)) => return Err(err.into()),
                Err(Failure::Output(err)) => return Err(err.into()),
            }
        }

        if request.stats {
            self.stats.write_summary(diag)?;
        }
        Ok(report)
    }
}

enum Failure {
    Decode(DecodeError),
    Container(ContainerError),
    Protocol(ProtocolError),
    Output(io::Error),
}

/// Where decoded records of one category go.
struct Sink<'a, W: ?Sized> {
    out: &'a mut W,
    options: &'a FlattenOptions,
    stats: Option<&'a mut EventStats>,
    emit: bool,
    lines: u64,
}

impl<W: Write + ?Sized> Sink<'_, W> {
    fn record(&mut self, record: Node) -> io::Result<()> {
        if let Some(stats) = self.stats.as_deref_mut() {
            stats.record(&record);
        }
        if self.emit {
            write_lambda_line(self.out, &flatten_with(record, self.options))?;
            self.lines += 1;
        }
        Ok(())
    }
}

fn decode_category<C, W>(
    protocol: &dyn Protocol,
    container: &C,
    category: Category,
    sink: &mut Sink<'_, W>,
) -> Result<(), Failure>
where
    C: Container + ?Sized,
    W: Write + ?Sized,
{
    if category == Category::TrackerEvents && !protocol.supports_tracker_events() {
        tracing::debug!(
            "Protocol {} has no tracker events; skipping",
            protocol.base_build()
        );
        return Ok(());
    }

    let contents = container.read(category).map_err(Failure::Container)?;
    let single = match category {
        Category::Details => protocol.decode_details(&contents),
        Category::InitData => protocol.decode_init_data(&contents),
        Category::AttributesEvents => protocol.decode_attributes_events(&contents),
        _ => {
            let events = match category {
                Category::GameEvents => protocol.decode_game_events(&contents),
                Category::MessageEvents => protocol.decode_message_events(&contents),
                _ => match protocol.decode_tracker_events(&contents) {
                    Ok(events) => events,
                    Err(missing @ ProtocolError::MissingOptionalCapability { .. }) => {
                        tracing::debug!("{}; skipping", missing);
                        return Ok(());
                    }
                    Err(err) => return Err(Failure::Protocol(err)),
                },
            };
            for event in events {
                let event = event.map_err(Failure::Decode)?;
                sink.record(event).map_err(Failure::Output)?;
            }
            return Ok(());
        }
    };
    let record = single.map_err(Failure::Decode)?;
    sink.record(record).map_err(Failure::Output)
}
