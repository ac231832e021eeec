use super::{Progress, QueryError};
use crate::models::steam::{
    AppId, Completion, IoFailure, MatchingUgcType, UgcDetails, UgcQuery, UgcQueryOrder,
    UgcQueryPage,
};
use crate::native::NativeClient;
use tokio::sync::oneshot;

/// A Workshop search as requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkshopSearch {
    pub max_results: u32,
    /// Free-text filter; `None` or empty matches everything
    pub search_text: Option<String>,
}

/// Which part of the Workshop a search covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogScope {
    pub app_id: AppId,
    /// Items match when they carry any of these tags
    pub required_tags: Vec<String>,
}

/// One Workshop item with its author's name and preview image
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub details: UgcDetails,
    pub author_name: String,
    pub preview_url: String,
}

pub type WorkshopReply = oneshot::Sender<Result<Vec<CatalogEntry>, QueryError>>;

/// Paging state machine for one Workshop search.
///
/// Each completed page contributes at most `remaining` entries. The search stops once
/// `remaining` hits zero, the platform's reported total has been collected, or a page
/// comes back empty, so it always terminates.
#[derive(Debug)]
pub struct WorkshopQuery {
    scope: CatalogScope,
    search_text: Option<String>,
    page: u32,
    remaining: u32,
    results: Vec<CatalogEntry>,
    reply: WorkshopReply,
}

impl WorkshopQuery {
    /// Request the first page, or resolve immediately when nothing is wanted
    pub fn start(
        client: &mut dyn NativeClient,
        scope: CatalogScope,
        search: WorkshopSearch,
        reply: WorkshopReply,
    ) -> Progress<Self> {
        let query = Self {
            scope,
            search_text: search.search_text.filter(|text| !text.is_empty()),
            page: 1,
            remaining: search.max_results,
            results: Vec::new(),
            reply,
        };

        if query.remaining == 0 {
            return query.resolve();
        }
        query.request_page(client)
    }

    fn request_page(self, client: &mut dyn NativeClient) -> Progress<Self> {
        let handle = client.send_ugc_query(UgcQuery {
            order: UgcQueryOrder::RankedByPublicationDate,
            matching: MatchingUgcType::ItemsReadyToUse,
            creator_app: self.scope.app_id,
            consumer_app: self.scope.app_id,
            page: self.page,
            required_tags: self.scope.required_tags.clone(),
            match_any_tag: true,
            search_text: self.search_text.clone(),
        });
        tracing::debug!(
            "Requested workshop page {} ({} results still wanted)",
            self.page,
            self.remaining
        );
        Progress::Waiting(handle, self)
    }

    pub fn on_completion(
        self,
        client: &mut dyn NativeClient,
        completion: Completion,
    ) -> Progress<Self> {
        match completion {
            Completion::UgcQueryCompleted(Ok(page)) => self.on_page(client, page),
            Completion::UgcQueryCompleted(Err(IoFailure)) => self.fail(QueryError::Transport),
            other => self.fail(QueryError::UnexpectedCompletion {
                expected: "SteamUGCQueryCompleted",
                actual: other.kind(),
            }),
        }
    }

    fn on_page(mut self, client: &mut dyn NativeClient, page: UgcQueryPage) -> Progress<Self> {
        let fetch_this_round = self.remaining.min(page.results_returned);

        for index in 0..fetch_this_round {
            let Some(details) = client.ugc_query_result(page.handle, index) else {
                client.release_ugc_query(page.handle);
                let message = format!(
                    "Error retrieving workshop result {} of page {}",
                    index, self.page
                );
                return self.fail(QueryError::DataRetrieval(message));
            };

            let author_name = client.persona_name(details.steam_id_owner);
            let preview_url = match client.ugc_preview_url(page.handle, index) {
                Some(url) => url,
                None => {
                    tracing::warn!(
                        "No preview image for workshop item {}",
                        details.published_file_id
                    );
                    String::new()
                }
            };
            self.results.push(CatalogEntry {
                details,
                author_name,
                preview_url,
            });
        }
        client.release_ugc_query(page.handle);

        self.remaining -= fetch_this_round;

        // The reported total may shift between pages on a live catalog; an empty page
        // ends the search regardless of what the total says.
        let collected_all = self.results.len() as u64 >= u64::from(page.total_matching_results);
        if collected_all || self.remaining == 0 || page.results_returned == 0 {
            return self.resolve();
        }

        self.page += 1;
        self.request_page(client)
    }

    fn resolve(self) -> Progress<Self> {
        tracing::debug!(
            "Workshop search resolved with {} results after {} page(s)",
            self.results.len(),
            self.page
        );
        let _ = self.reply.send(Ok(self.results));
        Progress::Resolved
    }

    fn fail(self, error: QueryError) -> Progress<Self> {
        tracing::warn!("Workshop search failed on page {}: {}", self.page, error);
        let _ = self.reply.send(Err(error));
        Progress::Resolved
    }
}
