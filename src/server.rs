use std::convert::Infallible;

use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use crate::curate::{AddEntry, Curator};
use crate::entry::EntryId;
use crate::error::Error;
use crate::feed::FeedAssembler;
use crate::provider::PlaylistProvider;
use crate::reply::{handle_rejection, respond};
use crate::store::{AllocatorStore, EntryStore, MessageStore};

mod types;

use types::{
    FeedQueryParams, FeedResponse, NextTitle, PreviewQueryParams, RebaseTitles, UpdateMessage,
    DEFAULT_PREVIEW_LIMIT,
};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Public feed plus the JSON admin surface.
///
/// Admin routes live under `/admin` and carry no authentication of their own;
/// whatever fronts the service is expected to guard that prefix.
pub fn make_server<S, P>(feed: FeedAssembler<S, P>, curator: Curator<S, P>) -> BoxedFilter<(impl Reply,)>
where
    S: EntryStore + AllocatorStore + MessageStore + 'static,
    P: PlaylistProvider + 'static,
{
    let with_feed = warp::any().map(move || feed.clone());
    let with_curator = warp::any().map(move || curator.clone());

    let feed_page_route = warp::path!("feed")
        .and(warp::get())
        .and(warp::query::<FeedQueryParams>())
        .and(with_feed)
        .and(with_curator.clone())
        .and_then(feed_page::<S, P>);

    let list_entries_route = warp::path!("admin" / "entries")
        .and(warp::get())
        .and(with_curator.clone())
        .and_then(list_entries::<S, P>);

    let add_entry_route = warp::path!("admin" / "entries")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<AddEntry>())
        .and(with_curator.clone())
        .and_then(add_entry::<S, P>);

    let delete_entry_route = warp::path!("admin" / "entries" / i64)
        .and(warp::delete())
        .and(with_curator.clone())
        .and_then(delete_entry::<S, P>);

    let preview_route = warp::path!("admin" / "entries" / i64 / "preview")
        .and(warp::get())
        .and(warp::query::<PreviewQueryParams>())
        .and(with_curator.clone())
        .and_then(preview::<S, P>);

    let next_title_route = warp::path!("admin" / "titles" / "next")
        .and(warp::get())
        .and(with_curator.clone())
        .and_then(next_title::<S, P>);

    let rebase_titles_route = warp::path!("admin" / "titles")
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<RebaseTitles>())
        .and(with_curator.clone())
        .and_then(rebase_titles::<S, P>);

    let update_message_route = warp::path!("admin" / "message")
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<UpdateMessage>())
        .and(with_curator)
        .and_then(update_message::<S, P>);

    feed_page_route
        .or(list_entries_route)
        .or(add_entry_route)
        .or(delete_entry_route)
        .or(preview_route)
        .or(next_title_route)
        .or(rebase_titles_route)
        .or(update_message_route)
        .recover(handle_rejection)
        .boxed()
}

async fn feed_page<S, P>(
    query: FeedQueryParams,
    feed: FeedAssembler<S, P>,
    curator: Curator<S, P>,
) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    let result = match feed.page(query.page()).await {
        Ok(page) => curator
            .message()
            .map(|message| FeedResponse { page, message }),
        Err(e) => Err(e.into()),
    };

    Ok(respond(result, StatusCode::OK))
}

async fn list_entries<S, P>(curator: Curator<S, P>) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    Ok(respond(curator.list_entries(), StatusCode::OK))
}

async fn add_entry<S, P>(request: AddEntry, curator: Curator<S, P>) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    Ok(respond(curator.add_entry(request), StatusCode::CREATED))
}

async fn delete_entry<S, P>(id: i64, curator: Curator<S, P>) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    let reply = match curator.delete_entry(EntryId(id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    };

    Ok(reply)
}

async fn preview<S, P>(
    id: i64,
    query: PreviewQueryParams,
    curator: Curator<S, P>,
) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    let limit = query.limit.unwrap_or(DEFAULT_PREVIEW_LIMIT);

    Ok(respond(curator.preview(EntryId(id), limit).await, StatusCode::OK))
}

async fn next_title<S, P>(curator: Curator<S, P>) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    let allocator = curator.allocator();
    let result = allocator
        .state()
        .map(|state| NextTitle {
            title: state.next_title(allocator.rule()),
            state,
        })
        .map_err(Error::from);

    Ok(respond(result, StatusCode::OK))
}

async fn rebase_titles<S, P>(request: RebaseTitles, curator: Curator<S, P>) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    let result = curator
        .allocator()
        .update_prefix(&request.prefix, request.counter);

    Ok(respond(result, StatusCode::OK))
}

async fn update_message<S, P>(request: UpdateMessage, curator: Curator<S, P>) -> Result<Response, Infallible>
where
    S: EntryStore + AllocatorStore + MessageStore,
    P: PlaylistProvider,
{
    Ok(respond(curator.set_message(&request.content), StatusCode::OK))
}
