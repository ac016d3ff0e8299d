//! Related-content resolver
//!
//! Given a source context, related contexts are the other contexts that
//! match at least one of its (sub-sector, signal-category) pairs exactly
//! on both fields. The match is an OR of ANDs over the full pair
//! cross-product, so sharing a sub-sector alone is never enough. If the
//! source has no sub-sectors or no signal categories there are no pairs
//! and the result is a soft miss rather than a broader match.
//!
//! Theme relation is deliberately looser: trending themes sharing any
//! sub-sector, falling back to shared sector when that finds nothing.
//! The two rules diverge on purpose; see DESIGN.md.
//!
//! Lookups go through small traits so the resolver's policy can be
//! exercised against in-memory fixtures.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use mongodb::options::FindOptions;

use super::dedup_contexts;
use super::resolution::{EmptyReason, Resolution};
use crate::db::mongo::MongoCollection;
use crate::db::schemas::{ContextDoc, PostDoc, PostKind, ThemeDoc};
use crate::types::Result;

/// Fixed size of the trending expert-opinion rail
pub const EXPERT_POST_LIMIT: usize = 5;

/// Cross-product of the source's sub-sectors and signal categories.
pub fn sub_sector_signal_pairs(source: &ContextDoc) -> Vec<(ObjectId, ObjectId)> {
    let mut pairs = Vec::with_capacity(source.sub_sectors.len() * source.signal_categories.len());
    for s in &source.sub_sectors {
        for g in &source.signal_categories {
            pairs.push((*s, *g));
        }
    }
    pairs
}

/// One `$or` branch per pair: both fields must match simultaneously.
pub fn pair_branches(pairs: &[(ObjectId, ObjectId)]) -> Vec<Document> {
    pairs
        .iter()
        .map(|(s, g)| doc! { "sub_sectors": s, "signal_categories": g })
        .collect()
}

/// Full related-context filter: any pair branch, excluding the source.
pub fn related_filter(pairs: &[(ObjectId, ObjectId)], exclude: &ObjectId) -> Document {
    doc! {
        "_id": { "$ne": exclude },
        "$or": pair_branches(pairs),
    }
}

/// Read seam over the contexts collection
#[async_trait]
pub trait ContextLookup: Send + Sync {
    /// Contexts other than `exclude` matching any (sub-sector, signal)
    /// pair, most recent first.
    async fn matching_pairs(
        &self,
        pairs: &[(ObjectId, ObjectId)],
        exclude: &ObjectId,
    ) -> Result<Vec<ContextDoc>>;
}

/// Read seam over the themes collection
#[async_trait]
pub trait ThemeLookup: Send + Sync {
    /// Trending themes tagged with any of `sub_sectors`, best score first.
    async fn trending_by_sub_sectors(
        &self,
        sub_sectors: &[ObjectId],
        exclude: Option<&ObjectId>,
    ) -> Result<Vec<ThemeDoc>>;

    /// Trending themes tagged with any of `sectors`, best score first.
    async fn trending_by_sectors(
        &self,
        sectors: &[ObjectId],
        exclude: Option<&ObjectId>,
    ) -> Result<Vec<ThemeDoc>>;
}

/// Read seam over the posts collection
#[async_trait]
pub trait PostLookup: Send + Sync {
    /// Posts with the given ids. Missing ids are skipped, not reported.
    async fn posts_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<PostDoc>>;
}

pub struct MongoContextLookup<'a> {
    pub contexts: &'a MongoCollection<ContextDoc>,
}

#[async_trait]
impl ContextLookup for MongoContextLookup<'_> {
    async fn matching_pairs(
        &self,
        pairs: &[(ObjectId, ObjectId)],
        exclude: &ObjectId,
    ) -> Result<Vec<ContextDoc>> {
        let options = FindOptions::builder()
            .sort(doc! { "publish_date": -1 })
            .projection(doc! { "pdf.data": 0 })
            .build();
        self.contexts
            .find_many_with_options(related_filter(pairs, exclude), Some(options))
            .await
    }
}

pub struct MongoThemeLookup<'a> {
    pub themes: &'a MongoCollection<ThemeDoc>,
}

impl MongoThemeLookup<'_> {
    async fn trending_matching(
        &self,
        field: &str,
        ids: &[ObjectId],
        exclude: Option<&ObjectId>,
    ) -> Result<Vec<ThemeDoc>> {
        let mut filter = doc! {
            "is_trending": true,
            field: { "$in": ids },
        };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        let options = FindOptions::builder()
            .sort(doc! { "trending_score": -1 })
            .build();
        self.themes
            .find_many_with_options(filter, Some(options))
            .await
    }
}

#[async_trait]
impl ThemeLookup for MongoThemeLookup<'_> {
    async fn trending_by_sub_sectors(
        &self,
        sub_sectors: &[ObjectId],
        exclude: Option<&ObjectId>,
    ) -> Result<Vec<ThemeDoc>> {
        self.trending_matching("sub_sectors", sub_sectors, exclude)
            .await
    }

    async fn trending_by_sectors(
        &self,
        sectors: &[ObjectId],
        exclude: Option<&ObjectId>,
    ) -> Result<Vec<ThemeDoc>> {
        self.trending_matching("sectors", sectors, exclude).await
    }
}

pub struct MongoPostLookup<'a> {
    pub posts: &'a MongoCollection<PostDoc>,
}

#[async_trait]
impl PostLookup for MongoPostLookup<'_> {
    async fn posts_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<PostDoc>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.posts
            .find_many(doc! { "_id": { "$in": ids } })
            .await
    }
}

/// Resolve the contexts related to `source`, deduplicated.
///
/// Soft miss when no (sub-sector, signal) pair can be formed; a formed
/// query that matches nothing is `Found` of an empty list.
pub async fn related_contexts(
    lookup: &impl ContextLookup,
    source: &ContextDoc,
) -> Result<Resolution<Vec<ContextDoc>>> {
    let Some(source_id) = source._id else {
        return Ok(Resolution::Empty(EmptyReason::NoPairs));
    };

    let pairs = sub_sector_signal_pairs(source);
    if pairs.is_empty() {
        return Ok(Resolution::Empty(EmptyReason::NoPairs));
    }

    let matches = lookup.matching_pairs(&pairs, &source_id).await?;
    Ok(Resolution::Found(dedup_contexts(matches)))
}

/// Trending themes related to a source, in two tiers: shared sub-sector
/// first, shared sector only when the first tier finds nothing.
pub async fn related_trending_themes(
    lookup: &impl ThemeLookup,
    sub_sectors: &[ObjectId],
    sectors: &[ObjectId],
    exclude: Option<&ObjectId>,
) -> Result<Vec<ThemeDoc>> {
    if !sub_sectors.is_empty() {
        let themes = lookup.trending_by_sub_sectors(sub_sectors, exclude).await?;
        if !themes.is_empty() {
            return Ok(themes);
        }
    }

    if sectors.is_empty() {
        return Ok(Vec::new());
    }
    lookup.trending_by_sectors(sectors, exclude).await
}

/// Every post id referenced by the given contexts, deduplicated, in
/// encounter order.
pub fn collect_post_ids(contexts: &[ContextDoc]) -> Vec<ObjectId> {
    let mut ids = Vec::new();
    for ctx in contexts {
        for post_ref in &ctx.posts {
            if !ids.contains(&post_ref.post_id) {
                ids.push(post_ref.post_id);
            }
        }
    }
    ids
}

/// Keep trending expert opinions, newest first, capped at `limit`.
pub fn select_expert_posts(mut posts: Vec<PostDoc>, limit: usize) -> Vec<PostDoc> {
    posts.retain(|p| p.post_type == PostKind::ExpertOpinion && p.is_trending);
    posts.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
    posts.truncate(limit);
    posts
}

/// Everything the context detail view derives from relations
pub struct RelatedContent {
    pub contexts: Resolution<Vec<ContextDoc>>,
    pub trending_themes: Vec<ThemeDoc>,
    pub expert_posts: Vec<PostDoc>,
}

/// Resolve related contexts, trending themes, and the expert-opinion
/// rail for one source context.
pub async fn resolve_related(
    context_lookup: &impl ContextLookup,
    theme_lookup: &impl ThemeLookup,
    post_lookup: &impl PostLookup,
    source: &ContextDoc,
) -> Result<RelatedContent> {
    let contexts = related_contexts(context_lookup, source).await?;

    let trending_themes = related_trending_themes(
        theme_lookup,
        &source.sub_sectors,
        &source.sectors,
        None,
    )
    .await?;

    // Expert opinions come out of the related contexts' post lists, the
    // source's own posts are already on screen
    let post_ids = match &contexts {
        Resolution::Found(related) => collect_post_ids(related),
        Resolution::Empty(_) => Vec::new(),
    };
    let posts = post_lookup.posts_by_ids(&post_ids).await?;
    let expert_posts = select_expert_posts(posts, EXPERT_POST_LIMIT);

    Ok(RelatedContent {
        contexts,
        trending_themes,
        expert_posts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ContextPostRef;
    use bson::DateTime;

    fn context(sub_sectors: Vec<ObjectId>, signals: Vec<ObjectId>) -> ContextDoc {
        let mut ctx = ContextDoc::default();
        ctx._id = Some(ObjectId::new());
        ctx.sub_sectors = sub_sectors;
        ctx.signal_categories = signals;
        ctx
    }

    /// In-memory stand-in mirroring Mongo's array-contains semantics
    struct StubContexts {
        data: Vec<ContextDoc>,
    }

    #[async_trait]
    impl ContextLookup for StubContexts {
        async fn matching_pairs(
            &self,
            pairs: &[(ObjectId, ObjectId)],
            exclude: &ObjectId,
        ) -> Result<Vec<ContextDoc>> {
            Ok(self
                .data
                .iter()
                .filter(|ctx| ctx._id.as_ref() != Some(exclude))
                .filter(|ctx| {
                    pairs.iter().any(|(s, g)| {
                        ctx.sub_sectors.contains(s) && ctx.signal_categories.contains(g)
                    })
                })
                .cloned()
                .collect())
        }
    }

    struct StubThemes {
        by_sub_sector: Vec<ThemeDoc>,
        by_sector: Vec<ThemeDoc>,
    }

    #[async_trait]
    impl ThemeLookup for StubThemes {
        async fn trending_by_sub_sectors(
            &self,
            _sub_sectors: &[ObjectId],
            _exclude: Option<&ObjectId>,
        ) -> Result<Vec<ThemeDoc>> {
            Ok(self.by_sub_sector.clone())
        }

        async fn trending_by_sectors(
            &self,
            _sectors: &[ObjectId],
            _exclude: Option<&ObjectId>,
        ) -> Result<Vec<ThemeDoc>> {
            Ok(self.by_sector.clone())
        }
    }

    #[test]
    fn test_pairs_are_full_cross_product() {
        let s1 = ObjectId::new();
        let s2 = ObjectId::new();
        let g1 = ObjectId::new();
        let g2 = ObjectId::new();
        let ctx = context(vec![s1, s2], vec![g1, g2]);

        let pairs = sub_sector_signal_pairs(&ctx);
        assert_eq!(pairs.len(), 4);
        assert!(pairs.contains(&(s1, g1)));
        assert!(pairs.contains(&(s2, g2)));
    }

    #[test]
    fn test_related_filter_shape() {
        let s = ObjectId::new();
        let g = ObjectId::new();
        let exclude = ObjectId::new();
        let filter = related_filter(&[(s, g)], &exclude);

        let ne = filter.get_document("_id").unwrap();
        assert_eq!(ne.get_object_id("$ne").unwrap(), exclude);

        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 1);
        let branch = branches[0].as_document().unwrap();
        assert_eq!(branch.get_object_id("sub_sectors").unwrap(), s);
        assert_eq!(branch.get_object_id("signal_categories").unwrap(), g);
    }

    #[tokio::test]
    async fn test_pair_match_requires_both_fields() {
        // A shares (X, Y) with B; C shares only X, its signal is Z
        let x = ObjectId::new();
        let y = ObjectId::new();
        let z = ObjectId::new();

        let a = context(vec![x], vec![y]);
        let b = context(vec![x], vec![y]);
        let c = context(vec![x], vec![z]);
        let b_id = b._id;

        let lookup = StubContexts {
            data: vec![a.clone(), b, c],
        };

        let resolved = related_contexts(&lookup, &a).await.unwrap();
        match resolved {
            Resolution::Found(related) => {
                assert_eq!(related.len(), 1);
                assert_eq!(related[0]._id, b_id);
            }
            Resolution::Empty(reason) => panic!("unexpected soft miss: {reason:?}"),
        }
    }

    #[tokio::test]
    async fn test_source_never_relates_to_itself() {
        let x = ObjectId::new();
        let y = ObjectId::new();
        let a = context(vec![x], vec![y]);

        let lookup = StubContexts {
            data: vec![a.clone()],
        };

        let resolved = related_contexts(&lookup, &a).await.unwrap();
        assert_eq!(resolved, Resolution::Found(Vec::new()));
    }

    #[tokio::test]
    async fn test_empty_axis_is_soft_miss() {
        let x = ObjectId::new();
        let no_signals = context(vec![x], vec![]);
        let no_subs = context(vec![], vec![x]);

        let lookup = StubContexts { data: vec![] };

        let resolved = related_contexts(&lookup, &no_signals).await.unwrap();
        assert_eq!(resolved, Resolution::Empty(EmptyReason::NoPairs));

        let resolved = related_contexts(&lookup, &no_subs).await.unwrap();
        assert_eq!(resolved, Resolution::Empty(EmptyReason::NoPairs));
    }

    #[tokio::test]
    async fn test_multi_pair_match_dedups() {
        // B matches A on two distinct pairs but appears once
        let s1 = ObjectId::new();
        let s2 = ObjectId::new();
        let g = ObjectId::new();

        let a = context(vec![s1, s2], vec![g]);
        let b = context(vec![s1, s2], vec![g]);
        let b_id = b._id;

        let lookup = StubContexts {
            data: vec![a.clone(), b.clone(), b],
        };

        let resolved = related_contexts(&lookup, &a).await.unwrap();
        match resolved {
            Resolution::Found(related) => {
                assert_eq!(related.len(), 1);
                assert_eq!(related[0]._id, b_id);
            }
            Resolution::Empty(reason) => panic!("unexpected soft miss: {reason:?}"),
        }
    }

    #[tokio::test]
    async fn test_theme_fallback_tiers() {
        let sub = ObjectId::new();
        let sector = ObjectId::new();
        let tier1_theme = ThemeDoc::new("Tier1", "tier1");
        let tier2_theme = ThemeDoc::new("Tier2", "tier2");

        // Tier 1 hits: sector tier must not run
        let lookup = StubThemes {
            by_sub_sector: vec![tier1_theme.clone()],
            by_sector: vec![tier2_theme.clone()],
        };
        let themes = related_trending_themes(&lookup, &[sub], &[sector], None)
            .await
            .unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].slug, "tier1");

        // Tier 1 empty: sector tier takes over
        let lookup = StubThemes {
            by_sub_sector: vec![],
            by_sector: vec![tier2_theme],
        };
        let themes = related_trending_themes(&lookup, &[sub], &[sector], None)
            .await
            .unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].slug, "tier2");

        // No sub-sectors at all skips straight to sectors
        let lookup = StubThemes {
            by_sub_sector: vec![tier1_theme],
            by_sector: vec![],
        };
        let themes = related_trending_themes(&lookup, &[], &[sector], None)
            .await
            .unwrap();
        assert!(themes.is_empty());
    }

    #[test]
    fn test_expert_selection_filters_sorts_limits() {
        use chrono::TimeZone;
        let day =
            |d: u32| DateTime::from_chrono(chrono::Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap());

        let mut posts = Vec::new();
        for d in 1..=8 {
            let mut p = PostDoc::new(format!("Expert {d}"), format!("expert-{d}"), day(d));
            p.post_type = PostKind::ExpertOpinion;
            p.is_trending = true;
            posts.push(p);
        }
        // Noise: trending news and a non-trending expert opinion
        let mut news = PostDoc::new("News", "news", day(9));
        news.is_trending = true;
        posts.push(news);
        let mut quiet = PostDoc::new("Quiet expert", "quiet-expert", day(10));
        quiet.post_type = PostKind::ExpertOpinion;
        posts.push(quiet);

        let selected = select_expert_posts(posts, EXPERT_POST_LIMIT);
        assert_eq!(selected.len(), EXPERT_POST_LIMIT);
        // Newest eligible first
        assert_eq!(selected[0].slug, "expert-8");
        assert_eq!(selected[4].slug, "expert-4");
        assert!(selected.iter().all(|p| p.post_type == PostKind::ExpertOpinion));
        assert!(selected.iter().all(|p| p.is_trending));
    }

    #[test]
    fn test_collect_post_ids_dedups_across_contexts() {
        let shared = ObjectId::new();
        let only_first = ObjectId::new();

        let mut first = ContextDoc::default();
        first.posts = vec![
            ContextPostRef {
                post_id: shared,
                include_in_container: true,
            },
            ContextPostRef {
                post_id: only_first,
                include_in_container: false,
            },
        ];
        let mut second = ContextDoc::default();
        second.posts = vec![ContextPostRef {
            post_id: shared,
            include_in_container: false,
        }];

        let ids = collect_post_ids(&[first, second]);
        assert_eq!(ids, vec![shared, only_first]);
    }
}
