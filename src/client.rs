//! Board-scoped LeanKit API client.
//!
//! [`LeanKitClient`] fixes the board id at construction and maps each API
//! operation onto a [`RequestDescriptor`] run through the shared
//! [`Transport`]. Most LeanKit endpoints wrap a single entity in an array;
//! those methods unwrap the first element.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::batch::BatchDownloader;
use crate::config::ClientConfig;
use crate::constants::BASE_PATH;
use crate::cookies::CookieStore;
use crate::download::{resolve_destination, write_response};
use crate::error::Error;
use crate::models::{AssignUserRequest, AttachmentDownload, CommentRequest, UnassignUserRequest};
use crate::request::{FilePayload, RequestDescriptor};
use crate::response::{Reply, first_element};
use crate::transport::Transport;

/// Client for one LeanKit board.
///
/// Cloning shares the connection pool and session cookies.
#[derive(Debug, Clone)]
pub struct LeanKitClient {
    transport: Transport,
    board_id: String,
    batch: BatchDownloader,
}

impl LeanKitClient {
    /// Builds a client from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client or proxy cannot be set up.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = Transport::new(&config)?;
        let batch = BatchDownloader::new(config.concurrency)?;
        Ok(Self {
            transport,
            board_id: config.board_id,
            batch,
        })
    }

    /// Board every call is scoped to.
    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Underlying transport, for calls without a dedicated method.
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Snapshot of the session cookies, if session mode is on.
    #[must_use]
    pub fn cookies(&self) -> Option<CookieStore> {
        self.transport.cookies()
    }

    /// Runs an arbitrary request.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Reply, Error> {
        self.transport.execute(descriptor).await
    }

    /// `GET boards/{boardId}`.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn get_board(&self) -> Result<Value, Error> {
        self.fetch_first(Self::endpoint(format!("boards/{}", self.board_id)))
            .await
    }

    /// `GET board/{boardId}/archive`.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn get_board_archive(&self) -> Result<Value, Error> {
        self.fetch_first(Self::endpoint(format!("board/{}/archive", self.board_id)))
            .await
    }

    /// `GET board/{boardId}/getcard/{cardId}`.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn get_card(&self, card_id: u64) -> Result<Value, Error> {
        self.fetch_first(Self::endpoint(format!("board/{}/getcard/{card_id}", self.board_id)))
            .await
    }

    /// Adds `card` to a lane at `position` (0 is the top).
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] if `card` does not serialize; otherwise see
    /// [`Transport::execute`].
    #[instrument(skip(self, card), fields(board_id = %self.board_id))]
    pub async fn post_card<T: Serialize + ?Sized>(
        &self,
        lane_id: u64,
        position: u32,
        card: &T,
    ) -> Result<Value, Error> {
        let descriptor = Self::endpoint(format!(
            "board/{}/AddCard/lane/{lane_id}/position/{position}",
            self.board_id
        ))
        .json(card)?;
        self.fetch_first(descriptor).await
    }

    /// `GET card/history/{boardId}/{cardId}`.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn get_card_history(&self, card_id: u64) -> Result<Value, Error> {
        self.fetch_first(Self::endpoint(format!("card/history/{}/{card_id}", self.board_id)))
            .await
    }

    /// Uploads `file` to a card as a multipart form.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self, file), fields(board_id = %self.board_id, filename = %file.filename))]
    pub async fn post_attachment(&self, card_id: u64, file: FilePayload) -> Result<Value, Error> {
        let descriptor = Self::endpoint(format!("card/saveAttachment/{}/{card_id}", self.board_id))
            .file(file);
        self.transport.execute(descriptor).await?.into_data()
    }

    /// `GET card/getAttachments/{boardId}/{cardId}`.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn get_attachment_list(&self, card_id: u64) -> Result<Value, Error> {
        self.fetch_first(Self::endpoint(format!("card/getAttachments/{}/{card_id}", self.board_id)))
            .await
    }

    /// Streams an attachment to `path`, resolved against the working
    /// directory. Returns the written path and its size in bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] for file failures; otherwise see [`Transport::execute`].
    #[instrument(skip(self, path), fields(board_id = %self.board_id, path = %path.display()))]
    pub async fn download_attachment(
        &self,
        attachment_id: u64,
        path: &Path,
    ) -> Result<(PathBuf, u64), Error> {
        let descriptor = Self::endpoint(format!(
            "card/downloadAttachment/{}/{attachment_id}",
            self.board_id
        ))
        .streamed();
        let response = self.transport.execute(descriptor).await?.into_stream()?;

        let destination = resolve_destination(path)?;
        let bytes = write_response(response, &destination).await?;
        info!(attachment_id, bytes, path = %destination.display(), "attachment downloaded");
        Ok((destination, bytes))
    }

    /// Downloads every item with the configured concurrency cap.
    ///
    /// # Errors
    ///
    /// [`Error::Precondition`] in dry-run mode, before any item starts.
    /// [`Error::Batch`] carrying each failed item's error otherwise.
    #[instrument(skip(self, items), fields(board_id = %self.board_id, items = items.len()))]
    pub async fn download_bulk_attachments(
        &self,
        items: Vec<AttachmentDownload>,
    ) -> Result<(), Error> {
        if self.transport.is_dry_run() {
            return Err(Error::Precondition(
                "dry run cannot be combined with bulk downloads",
            ));
        }

        self.batch
            .download_all(items, |item| {
                let client = self.clone();
                async move {
                    client
                        .download_attachment(item.id, &item.path)
                        .await
                        .map(|_| ())
                }
            })
            .await
    }

    /// `GET card/getComments/{boardId}/{cardId}`.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn get_comments(&self, card_id: u64) -> Result<Value, Error> {
        self.fetch_first(Self::endpoint(format!("card/getComments/{}/{card_id}", self.board_id)))
            .await
    }

    /// Posts a comment; `text` may contain HTML.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self, text), fields(board_id = %self.board_id))]
    pub async fn post_comment(&self, card_id: u64, text: &str) -> Result<Value, Error> {
        let descriptor = Self::endpoint(format!("card/saveComment/{}/{card_id}", self.board_id))
            .json(&CommentRequest { text })?;
        self.transport.execute(descriptor).await?.into_data()
    }

    /// Assigns a user to a card. LeanKit wants `override_comment` when the
    /// assignment exceeds a WIP limit.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self, override_comment), fields(board_id = %self.board_id))]
    pub async fn assign_user(
        &self,
        card_id: u64,
        user_id: u64,
        override_comment: Option<&str>,
    ) -> Result<Value, Error> {
        let descriptor = Self::endpoint(format!("board/{}/AssignUserLite", self.board_id))
            .json(&AssignUserRequest {
                card_id,
                user_id,
                override_comment,
            })?;
        self.transport.execute(descriptor).await?.into_data()
    }

    /// Removes a user from a card.
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`].
    #[instrument(skip(self), fields(board_id = %self.board_id))]
    pub async fn unassign_user(&self, card_id: u64, user_id: u64) -> Result<Value, Error> {
        let descriptor = Self::endpoint(format!("board/{}/UnassignUserLite", self.board_id))
            .json(&UnassignUserRequest { card_id, user_id })?;
        self.transport.execute(descriptor).await?.into_data()
    }

    /// Descriptor for `{BASE_PATH}/{relative}`; GET unless a body is added.
    fn endpoint(relative: String) -> RequestDescriptor {
        RequestDescriptor::new(format!("{BASE_PATH}/{relative}"))
    }

    async fn fetch_first(&self, descriptor: RequestDescriptor) -> Result<Value, Error> {
        let data = self.transport.execute(descriptor).await?.into_data()?;
        Ok(first_element(data))
    }
}
