//! In-memory [`Backend`] serving a [`Dataset`].
//!
//! Every request is answered synchronously through the event sink, in the
//! order a remote backend would answer it. Item operations are not
//! supported and fail.

use std::collections::HashMap;

use lens::browse::path;
use lens::query::{OrderTerm, Term};
use lens::{Backend, BackendEvent, EventSink, ModelCapabilities, PendingReply, Record, SessionId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::filter::{matches, sort_records};

/// Per-session state kept by the backend.
#[derive(Debug, Default)]
struct View {
    content_type: String,
    filter: Option<Term>,
    order: Vec<OrderTerm>,
    /// Rows sent so far, by index; resolves `go_forward`.
    items: Vec<Option<Record>>,
}

pub struct MemoryBackend {
    dataset: Dataset,
    sink: Option<EventSink>,
    views: HashMap<SessionId, View>,
}

impl MemoryBackend {
    pub fn capabilities() -> ModelCapabilities {
        ModelCapabilities::SUPPORTS_FILTERING
            | ModelCapabilities::SUPPORTS_SORTING
            | ModelCapabilities::SUPPORTS_AND_CONJUNCTION
            | ModelCapabilities::SUPPORTS_OR_CONJUNCTION
            | ModelCapabilities::SUPPORTS_STATELESS_NAVIGATION
            | ModelCapabilities::SUPPORTS_GET_SIZE
    }

    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            sink: None,
            views: HashMap::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// All rows of `content_type` that pass `filter`, in `order`.
    ///
    /// Every `type?id` segment of the path restricts the rows to children
    /// of the selected record: the row's field named after that type must
    /// equal the selected record's name.
    pub fn resolve(
        &self,
        content_type: &str,
        filter: Option<&Term>,
        order: &[OrderTerm],
    ) -> Result<Vec<Record>> {
        let segments = path::segments(content_type)?;
        let Some((leaf, ancestors)) = segments.split_last() else {
            return Err(Error::Dataset("empty content type".to_string()));
        };
        if leaf.selection.is_some() || !self.dataset.has_type(&leaf.content_type) {
            return Err(Error::Dataset(format!(
                "unknown content type '{}'",
                content_type
            )));
        }

        let mut constraints = Vec::new();
        for segment in ancestors {
            let Some(selection) = &segment.selection else {
                continue;
            };
            let parent = self
                .dataset
                .find(&segment.content_type, selection)
                .ok_or_else(|| {
                    Error::Dataset(format!(
                        "no {} with id '{}'",
                        segment.content_type, selection
                    ))
                })?;
            constraints.push((segment.content_type.as_str(), parent.name.as_str()));
        }

        let mut rows: Vec<Record> = self
            .dataset
            .records_of(&leaf.content_type)
            .filter(|record| {
                constraints.iter().all(|(field, name)| {
                    record.field(field).as_ref().and_then(Value::as_str) == Some(*name)
                })
            })
            .filter(|record| filter.map_or(true, |term| matches(term, record)))
            .cloned()
            .collect();
        sort_records(&mut rows, order);
        Ok(rows)
    }

    fn emit(&self, event: BackendEvent) {
        match &self.sink {
            Some(sink) => {
                if !sink.emit(event) {
                    debug!("browser is gone; dropping event");
                }
            }
            None => warn!("backend used before initialize"),
        }
    }
}

impl Backend for MemoryBackend {
    fn initialize(&mut self, sink: EventSink) {
        self.sink = Some(sink);
        self.emit(BackendEvent::AvailableContentTypesChanged(
            self.dataset.content_types(),
        ));
        self.emit(BackendEvent::CapabilitiesChanged {
            session: None,
            capabilities: Self::capabilities(),
        });
        self.emit(BackendEvent::InitializationDone);
    }

    fn register_instance(&mut self, session: SessionId) {
        self.views.insert(session, View::default());
        self.emit(BackendEvent::CapabilitiesChanged {
            session: Some(session),
            capabilities: Self::capabilities(),
        });
    }

    fn unregister_instance(&mut self, session: SessionId) {
        self.views.remove(&session);
    }

    fn set_content_type(&mut self, session: SessionId, content_type: &str) {
        let leaf = path::leaf_type(content_type);
        if !self.dataset.has_type(leaf) {
            warn!(%session, content_type, "unsupported content type");
            return;
        }
        if let Err(e) = path::segments(content_type) {
            warn!(%session, content_type, error = %e, "malformed content type");
            return;
        }

        let view = self.views.entry(session).or_default();
        view.content_type = content_type.to_string();
        view.items.clear();

        let identifiers = self.dataset.identifiers(leaf);
        self.emit(BackendEvent::QueryIdentifiersChanged {
            session,
            identifiers,
        });
        self.emit(BackendEvent::CanGoBackChanged {
            session,
            allowed: path::depth(content_type) >= 2,
        });
        self.emit(BackendEvent::ContentTypeChanged {
            session,
            content_type: content_type.to_string(),
        });
    }

    fn setup_filter(&mut self, session: SessionId, filter: Option<&Term>, order: &[OrderTerm]) {
        let view = self.views.entry(session).or_default();
        view.filter = filter.cloned();
        view.order = order.to_vec();
    }

    fn fetch_data(&mut self, session: SessionId, start: usize, count: usize) {
        let Some(view) = self.views.get(&session) else {
            warn!(%session, "fetch for unregistered session");
            return;
        };
        debug!(%session, content_type = %view.content_type, start, count, "fetch");

        let rows = match self.resolve(&view.content_type, view.filter.as_ref(), &view.order) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(%session, error = %e, "cannot resolve rows");
                Vec::new()
            }
        };
        let total = rows.len();
        let page: Vec<Record> = rows
            .into_iter()
            .skip(start)
            .take(count)
            .collect();
        let more_available = count > 0 && page.len() >= count;
        let navigable = self
            .dataset
            .child_type(path::leaf_type(&view.content_type))
            .is_some();

        if let Some(view) = self.views.get_mut(&session) {
            let end = start + page.len();
            if view.items.len() < end {
                view.items.resize(end, None);
            }
            for (slot, record) in view.items[start..end].iter_mut().zip(&page) {
                *slot = Some(record.clone());
            }
        }

        let fetched = page.len();
        self.emit(BackendEvent::CountChanged {
            session,
            count: total,
        });
        self.emit(BackendEvent::DataFetched {
            session,
            records: page,
            start,
            more_available,
        });
        if navigable && fetched > 0 {
            self.emit(BackendEvent::CanGoForwardChanged {
                session,
                flags: vec![true; fetched],
                start,
            });
        }
    }

    fn go_forward(&mut self, session: SessionId, index: usize) -> PendingReply<String> {
        let Some(view) = self.views.get(&session) else {
            return PendingReply::failed();
        };
        let Some(item) = view.items.get(index).and_then(Option::as_ref) else {
            warn!(%session, index, "go forward on a row that was never fetched");
            return PendingReply::failed();
        };
        match self.dataset.child_type(path::leaf_type(&view.content_type)) {
            Some(child) => PendingReply::success(path::descend(&view.content_type, &item.id, child)),
            None => PendingReply::failed(),
        }
    }

    fn go_back(&mut self, session: SessionId) -> PendingReply<String> {
        match self
            .views
            .get(&session)
            .and_then(|view| path::ascend(&view.content_type))
        {
            Some(parent) => PendingReply::success(parent),
            None => PendingReply::failed(),
        }
    }
}
