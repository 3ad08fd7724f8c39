//! Ranking helpers used to pick a single image out of TMDB's candidate lists.
//!
//! All rankings use `sort_by` (stable) with total comparators, so ties keep
//! upstream order. A missing list ranks to an empty one.

use std::cmp::Ordering;

/// Widescreen ratio preferred for backgrounds.
pub const WIDESCREEN: f64 = 1.778;

pub trait Votable {
    fn vote_average(&self) -> f64;
    fn vote_count(&self) -> u64;
}

pub trait AspectRatio {
    fn aspect_ratio(&self) -> f64;
}

fn compare_votes<T: Votable>(a: &T, b: &T) -> Ordering {
    b.vote_average()
        .total_cmp(&a.vote_average())
        .then_with(|| b.vote_count().cmp(&a.vote_count()))
}

fn ratio_distance<T: AspectRatio>(item: &T, preferred: f64) -> f64 {
    (item.aspect_ratio() - preferred).abs()
}

fn compare_aspect_ratio<T: AspectRatio>(a: &T, b: &T, preferred: f64) -> Ordering {
    ratio_distance(a, preferred).total_cmp(&ratio_distance(b, preferred))
}

/// Highest `vote_average` first, then highest `vote_count`.
pub fn by_rating<T: Votable>(items: Option<Vec<T>>) -> Vec<T> {
    let mut items = items.unwrap_or_default();
    items.sort_by(compare_votes);
    items
}

/// Closest to `preferred` first.
pub fn by_aspect_ratio<T: AspectRatio>(items: Option<Vec<T>>, preferred: f64) -> Vec<T> {
    let mut items = items.unwrap_or_default();
    items.sort_by(|a, b| compare_aspect_ratio(a, b, preferred));
    items
}

/// Aspect-ratio distance first, rating breaks ties.
pub fn by_aspect_ratio_then_rating<T: Votable + AspectRatio>(
    items: Option<Vec<T>>,
    preferred: f64,
) -> Vec<T> {
    let mut items = items.unwrap_or_default();
    items.sort_by(|a, b| {
        compare_aspect_ratio(a, b, preferred).then_with(|| compare_votes(a, b))
    });
    items
}
