//! 分段选择：同一 index 只保留一个代表，生成按 index 升序的下载计划。
//!
//! 规则：清晰度高者优先（缺失视为最低）；清晰度相同则 content-length 大者优先
//! （缺失视为最低）；完全相同则保留最先出现的候选。

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use thiserror::Error;
use tracing::{debug, info};

use super::models::{CandidateSegment, SelectedSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no media segments found in capture")]
pub struct EmptySelection;

pub fn select(candidates: Vec<CandidateSegment>) -> Result<Vec<SelectedSegment>, EmptySelection> {
    if candidates.is_empty() {
        return Err(EmptySelection);
    }

    let total = candidates.len();
    let mut best: BTreeMap<u64, CandidateSegment> = BTreeMap::new();
    for item in candidates {
        match best.entry(item.index) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => {
                if outranks(&item, slot.get()) {
                    debug!(
                        target: "download",
                        index = item.index,
                        replaced = %slot.get().url,
                        with = %item.url,
                        "替换重复分段"
                    );
                    slot.insert(item);
                }
            }
        }
    }

    info!(
        target: "download",
        candidates = total,
        selected = best.len(),
        "分段选择完成"
    );
    Ok(best.into_values().map(SelectedSegment::from).collect())
}

/// 严格优于才替换，保证相同条件下先出现者胜出。
fn outranks(challenger: &CandidateSegment, current: &CandidateSegment) -> bool {
    // Option 的排序中 None 小于任何 Some，正好对应“缺失视为最低”。
    (challenger.quality, challenger.declared_size) > (current.quality, current.declared_size)
}
