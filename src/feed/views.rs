//! Display-ready view shapes
//!
//! Documents store snake_case fields and raw ObjectId references; the
//! HTTP surface speaks camelCase and human-readable names. Assembly is
//! pure: handlers fetch the referenced documents, build a [`ViewData`]
//! of lookup maps, and map each document through its view builder. A
//! reference that resolves to nothing is skipped, never an error.

use std::collections::{HashMap, HashSet};

use bson::oid::ObjectId;
use bson::doc;
use chrono::SecondsFormat;
use serde::Serialize;

use super::paginator::DayPage;
use super::related::collect_post_ids;
use crate::cache::TaxonomySnapshot;
use crate::db::schemas::{
    ContainerKind, ContextDoc, MessageDoc, NarrativeBlock, PostDoc, Slide, ThemeDoc,
};
use crate::db::Collections;
use crate::types::Result;

/// RFC 3339 with milliseconds, UTC
fn iso(ts: bson::DateTime) -> String {
    ts.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Resolved reference documents keyed by id
#[derive(Default)]
pub struct ViewData {
    pub sector_names: HashMap<ObjectId, String>,
    pub sub_sector_names: HashMap<ObjectId, String>,
    pub signal_names: HashMap<ObjectId, String>,
    pub sub_signal_names: HashMap<ObjectId, String>,
    pub source_names: HashMap<ObjectId, String>,
    pub themes: HashMap<ObjectId, ThemeDoc>,
    pub posts: HashMap<ObjectId, PostDoc>,
}

/// Build an id-to-name map from docs exposing `(Option<ObjectId>, name)`.
pub fn name_map<T>(docs: &[T], parts: impl Fn(&T) -> (Option<ObjectId>, &str)) -> HashMap<ObjectId, String> {
    docs.iter()
        .filter_map(|d| {
            let (id, name) = parts(d);
            id.map(|id| (id, name.to_string()))
        })
        .collect()
}

impl ViewData {
    /// Seed sector and sub-sector names from a taxonomy snapshot.
    pub fn from_snapshot(snapshot: &TaxonomySnapshot) -> Self {
        Self {
            sector_names: name_map(&snapshot.sectors, |s| (s._id, s.name.as_str())),
            sub_sector_names: name_map(&snapshot.sub_sectors, |s| (s._id, s.name.as_str())),
            ..Self::default()
        }
    }
}

/// Fetch everything the given contexts reference and index it for view
/// assembly. The signal, sub-signal and source lists are small and loaded
/// whole; themes and posts are fetched by id. A reference that resolves to
/// nothing simply stays absent from the maps.
pub async fn load_view_data(
    collections: &Collections,
    snapshot: &TaxonomySnapshot,
    contexts: &[ContextDoc],
) -> Result<ViewData> {
    let mut data = ViewData::from_snapshot(snapshot);

    let (signals, sub_signals, sources) = tokio::join!(
        collections.signals.find_many(doc! {}),
        collections.sub_signals.find_many(doc! {}),
        collections.sources.find_many(doc! {}),
    );
    data.signal_names = name_map(&signals?, |s| (s._id, s.name.as_str()));
    data.sub_signal_names = name_map(&sub_signals?, |s| (s._id, s.name.as_str()));
    data.source_names = name_map(&sources?, |s| (s._id, s.name.as_str()));

    let mut theme_ids: Vec<ObjectId> = Vec::new();
    let mut seen = HashSet::new();
    for ctx in contexts {
        for id in &ctx.themes {
            if seen.insert(*id) {
                theme_ids.push(*id);
            }
        }
    }
    if !theme_ids.is_empty() {
        let themes = collections
            .themes
            .find_many(doc! { "_id": { "$in": theme_ids } })
            .await?;
        data.themes = themes
            .into_iter()
            .filter_map(|t| t._id.map(|id| (id, t)))
            .collect();
    }

    let post_ids = collect_post_ids(contexts);
    if !post_ids.is_empty() {
        let posts = collections
            .posts
            .find_many(doc! { "_id": { "$in": post_ids } })
            .await?;
        data.posts = posts
            .into_iter()
            .filter_map(|p| p._id.map(|id| (id, p)))
            .collect();
    }

    Ok(data)
}

/// Named taxonomy reference on the wire
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaxonomyRef {
    pub id: String,
    pub name: String,
}

fn taxonomy_refs(ids: &[ObjectId], names: &HashMap<ObjectId, String>) -> Vec<TaxonomyRef> {
    ids.iter()
        .filter_map(|id| {
            names.get(id).map(|name| TaxonomyRef {
                id: id.to_hex(),
                name: name.clone(),
            })
        })
        .collect()
}

/// Compact theme reference for rails and chips
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub is_trending: bool,
    pub trending_score: f64,
}

pub fn theme_summary(theme: &ThemeDoc) -> Option<ThemeSummary> {
    Some(ThemeSummary {
        id: theme._id?.to_hex(),
        title: theme.title.clone(),
        slug: theme.slug.clone(),
        is_trending: theme.is_trending,
        trending_score: theme.trending_score,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub post_type: String,
    pub publish_date: String,
    pub is_trending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub source_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

pub fn post_view(post: &PostDoc, data: &ViewData) -> Option<PostView> {
    Some(PostView {
        id: post._id?.to_hex(),
        title: post.title.clone(),
        slug: post.slug.clone(),
        post_type: post.post_type.as_str().to_string(),
        publish_date: iso(post.publish_date),
        is_trending: post.is_trending,
        summary: post.summary.clone(),
        source_urls: post.source_urls.clone(),
        source_name: post
            .source
            .and_then(|id| data.source_names.get(&id).cloned()),
    })
}

/// PDF presence and metadata without the bytes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfInfo {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub publish_date: String,
    pub is_trending: bool,
    pub display_order: i32,
    pub container_kind: ContainerKind,
    pub sectors: Vec<TaxonomyRef>,
    pub sub_sectors: Vec<TaxonomyRef>,
    pub signal_categories: Vec<TaxonomyRef>,
    pub signal_sub_categories: Vec<TaxonomyRef>,
    pub themes: Vec<ThemeSummary>,
    /// Only posts flagged for in-container rendering
    pub posts: Vec<PostView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub slides: Vec<Slide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfInfo>,
}

pub fn context_view(ctx: &ContextDoc, data: &ViewData) -> Option<ContextView> {
    let posts = ctx
        .posts
        .iter()
        .filter(|r| r.include_in_container)
        .filter_map(|r| data.posts.get(&r.post_id))
        .filter_map(|p| post_view(p, data))
        .collect();

    let themes = ctx
        .themes
        .iter()
        .filter_map(|id| data.themes.get(id))
        .filter_map(theme_summary)
        .collect();

    Some(ContextView {
        id: ctx._id?.to_hex(),
        title: ctx.title.clone(),
        slug: ctx.slug.clone(),
        publish_date: iso(ctx.publish_date),
        is_trending: ctx.is_trending,
        display_order: ctx.display_order,
        container_kind: ctx.container_kind,
        sectors: taxonomy_refs(&ctx.sectors, &data.sector_names),
        sub_sectors: taxonomy_refs(&ctx.sub_sectors, &data.sub_sector_names),
        signal_categories: taxonomy_refs(&ctx.signal_categories, &data.signal_names),
        signal_sub_categories: taxonomy_refs(&ctx.signal_sub_categories, &data.sub_signal_names),
        themes,
        posts,
        summary: ctx.summary.clone(),
        slides: ctx.slides.clone(),
        banner_image: ctx.banner_image.clone(),
        pdf: ctx.pdf.as_ref().map(|pdf| PdfInfo {
            file_name: pdf.file_name.clone(),
            content_type: pdf.content_type.clone(),
            size_bytes: pdf.size_bytes,
        }),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeBlockView {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysisView {
    pub overall_summary: String,
    pub drivers: Vec<NarrativeBlockView>,
    pub regional_insights: Vec<NarrativeBlockView>,
    pub consumer_insights: Vec<NarrativeBlockView>,
}

fn narrative_blocks(blocks: &[NarrativeBlock]) -> Vec<NarrativeBlockView> {
    blocks
        .iter()
        .map(|b| NarrativeBlockView {
            heading: b.heading.clone(),
            body: b.body.clone(),
        })
        .collect()
}

/// Full theme detail
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_trending: bool,
    pub trending_score: f64,
    pub impact_score: f64,
    pub predictive_momentum_score: f64,
    pub sectors: Vec<TaxonomyRef>,
    pub sub_sectors: Vec<TaxonomyRef>,
    pub trend_analysis: TrendAnalysisView,
}

pub fn theme_view(theme: &ThemeDoc, data: &ViewData) -> Option<ThemeView> {
    Some(ThemeView {
        id: theme._id?.to_hex(),
        title: theme.title.clone(),
        slug: theme.slug.clone(),
        description: theme.description.clone(),
        is_trending: theme.is_trending,
        trending_score: theme.trending_score,
        impact_score: theme.impact_score,
        predictive_momentum_score: theme.predictive_momentum_score,
        sectors: taxonomy_refs(&theme.sectors, &data.sector_names),
        sub_sectors: taxonomy_refs(&theme.sub_sectors, &data.sub_sector_names),
        trend_analysis: TrendAnalysisView {
            overall_summary: theme.trend_analysis.overall_summary.clone(),
            drivers: narrative_blocks(&theme.trend_analysis.drivers),
            regional_insights: narrative_blocks(&theme.trend_analysis.regional_insights),
            consumer_insights: narrative_blocks(&theme.trend_analysis.consumer_insights),
        },
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    pub publish_date: String,
}

pub fn message_view(msg: &MessageDoc) -> Option<MessageView> {
    Some(MessageView {
        id: msg._id?.to_hex(),
        title: msg.title.clone(),
        body: msg.body.clone(),
        publish_date: iso(msg.publish_date),
    })
}

/// Body of the paginated feed response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub contexts: Vec<ContextView>,
    pub messages: Vec<MessageView>,
    pub trending_themes: Vec<ThemeSummary>,
    pub expert_posts: Vec<PostView>,
    pub has_more: bool,
    /// ISO date of the day this page covers; absent on an empty page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_date: Option<String>,
}

impl FeedResponse {
    /// Soft-miss body: empty lists, no further pages.
    pub fn empty() -> Self {
        Self {
            contexts: Vec::new(),
            messages: Vec::new(),
            trending_themes: Vec::new(),
            expert_posts: Vec::new(),
            has_more: false,
            current_date: None,
        }
    }
}

/// Assemble the feed body for a resolved page.
pub fn feed_response(
    page: &DayPage,
    messages: &[MessageDoc],
    trending_themes: &[ThemeDoc],
    expert_posts: &[PostDoc],
    data: &ViewData,
) -> FeedResponse {
    FeedResponse {
        contexts: page
            .contexts
            .iter()
            .filter_map(|ctx| context_view(ctx, data))
            .collect(),
        messages: messages.iter().filter_map(message_view).collect(),
        trending_themes: trending_themes.iter().filter_map(theme_summary).collect(),
        expert_posts: expert_posts
            .iter()
            .filter_map(|p| post_view(p, data))
            .collect(),
        has_more: page.has_more,
        current_date: Some(page.day.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ContextPostRef;

    fn data_with_sector(id: ObjectId, name: &str) -> ViewData {
        let mut data = ViewData::default();
        data.sector_names.insert(id, name.to_string());
        data
    }

    #[test]
    fn test_unknown_references_are_skipped() {
        let known = ObjectId::new();
        let unknown = ObjectId::new();
        let data = data_with_sector(known, "Fintech");

        let mut ctx = ContextDoc::default();
        ctx._id = Some(ObjectId::new());
        ctx.sectors = vec![known, unknown];
        ctx.posts = vec![ContextPostRef {
            post_id: ObjectId::new(), // deleted post, not in data.posts
            include_in_container: true,
        }];

        let view = context_view(&ctx, &data).unwrap();
        assert_eq!(view.sectors.len(), 1);
        assert_eq!(view.sectors[0].name, "Fintech");
        assert!(view.posts.is_empty());
    }

    #[test]
    fn test_only_container_posts_render() {
        let mut shown = PostDoc::default();
        shown._id = Some(ObjectId::new());
        shown.title = "Shown".to_string();
        let mut hidden = PostDoc::default();
        hidden._id = Some(ObjectId::new());
        hidden.title = "Hidden".to_string();

        let mut data = ViewData::default();
        data.posts.insert(shown._id.unwrap(), shown.clone());
        data.posts.insert(hidden._id.unwrap(), hidden.clone());

        let mut ctx = ContextDoc::default();
        ctx._id = Some(ObjectId::new());
        ctx.posts = vec![
            ContextPostRef {
                post_id: shown._id.unwrap(),
                include_in_container: true,
            },
            ContextPostRef {
                post_id: hidden._id.unwrap(),
                include_in_container: false,
            },
        ];

        let view = context_view(&ctx, &data).unwrap();
        assert_eq!(view.posts.len(), 1);
        assert_eq!(view.posts[0].title, "Shown");
    }

    #[test]
    fn test_publish_date_is_rfc3339_utc() {
        let mut post = PostDoc::default();
        post._id = Some(ObjectId::new());
        post.publish_date = bson::DateTime::from_millis(1_772_193_600_000);

        let view = post_view(&post, &ViewData::default()).unwrap();
        assert!(view.publish_date.ends_with('Z'));
        assert!(view.publish_date.starts_with("2026-"));
    }

    #[test]
    fn test_feed_body_serializes_camel_case() {
        let body = serde_json::to_value(FeedResponse::empty()).unwrap();
        assert!(body.get("trendingThemes").is_some());
        assert!(body.get("expertPosts").is_some());
        assert!(body.get("hasMore").is_some());
        // Soft-miss body has no currentDate at all
        assert!(body.get("currentDate").is_none());
    }

    #[test]
    fn test_pdf_info_drops_bytes() {
        use crate::db::schemas::PdfAttachment;

        let mut ctx = ContextDoc::default();
        ctx._id = Some(ObjectId::new());
        ctx.pdf = Some(PdfAttachment {
            file_name: "deck.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            data: bson::Binary {
                subtype: bson::spec::BinarySubtype::Generic,
                bytes: vec![1, 2, 3],
            },
            sha256: "abc".to_string(),
            size_bytes: 3,
        });

        let view = context_view(&ctx, &ViewData::default()).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["pdf"]["fileName"], "deck.pdf");
        assert!(json["pdf"].get("data").is_none());
    }
}
