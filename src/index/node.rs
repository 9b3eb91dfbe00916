//! On-disk layouts for the three page kinds this index owns: the meta
//! page, leaf nodes, and non-leaf nodes. All three live in the body of a
//! `Page` (past its 32-byte header) and are accessed by manual byte-slice
//! arithmetic, in the same style as the primary-key B-tree this crate grew
//! out of — generalised from a fixed `i64` key to any `K: IndexKey`, and
//! from sentinel-implied occupancy to an explicit count field.

use super::key::{IndexKey, RecordId, RECORD_ID_WIDTH};
use crate::storage::page::{Page, PageFlags, HEADER_LEN};
use crate::storage::paged_file::{PageId, NO_PAGE};

const BODY_START: usize = HEADER_LEN;

// ---------------------------------------------------------------- Meta page

const META_RELATION_NAME_LEN: usize = 20;
const META_OFF_RELATION_NAME: usize = BODY_START;
const META_OFF_ATTR_OFFSET: usize = META_OFF_RELATION_NAME + META_RELATION_NAME_LEN;
const META_OFF_ATTR_TYPE: usize = META_OFF_ATTR_OFFSET + 4;
const META_OFF_ROOT_PAGE_NO: usize = META_OFF_ATTR_TYPE + 4;

pub fn meta_init(page: &mut Page, relation_name: &str, attr_offset: i32, attr_type: i32, root_page_no: PageId) {
    let bytes = page.as_bytes_mut();
    let name_bytes = relation_name.as_bytes();
    let n = name_bytes.len().min(META_RELATION_NAME_LEN);
    bytes[META_OFF_RELATION_NAME..META_OFF_RELATION_NAME + META_RELATION_NAME_LEN].fill(0);
    bytes[META_OFF_RELATION_NAME..META_OFF_RELATION_NAME + n].copy_from_slice(&name_bytes[..n]);
    bytes[META_OFF_ATTR_OFFSET..META_OFF_ATTR_OFFSET + 4].copy_from_slice(&attr_offset.to_le_bytes());
    bytes[META_OFF_ATTR_TYPE..META_OFF_ATTR_TYPE + 4].copy_from_slice(&attr_type.to_le_bytes());
    bytes[META_OFF_ROOT_PAGE_NO..META_OFF_ROOT_PAGE_NO + 4].copy_from_slice(&root_page_no.to_le_bytes());
}

pub fn meta_relation_name(page: &Page) -> String {
    let bytes = &page.as_bytes()[META_OFF_RELATION_NAME..META_OFF_RELATION_NAME + META_RELATION_NAME_LEN];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub fn meta_attr_offset(page: &Page) -> i32 {
    i32::from_le_bytes(page.as_bytes()[META_OFF_ATTR_OFFSET..META_OFF_ATTR_OFFSET + 4].try_into().unwrap())
}

pub fn meta_attr_type(page: &Page) -> i32 {
    i32::from_le_bytes(page.as_bytes()[META_OFF_ATTR_TYPE..META_OFF_ATTR_TYPE + 4].try_into().unwrap())
}

pub fn meta_root_page_no(page: &Page) -> PageId {
    u32::from_le_bytes(page.as_bytes()[META_OFF_ROOT_PAGE_NO..META_OFF_ROOT_PAGE_NO + 4].try_into().unwrap())
}

pub fn meta_set_root_page_no(page: &mut Page, root: PageId) {
    page.as_bytes_mut()[META_OFF_ROOT_PAGE_NO..META_OFF_ROOT_PAGE_NO + 4].copy_from_slice(&root.to_le_bytes());
}

// -------------------------------------------------------------- Leaf nodes

const LEAF_OFF_N: usize = BODY_START;
const LEAF_OFF_RIGHT_SIB: usize = LEAF_OFF_N + 2;
const LEAF_OFF_ENTRIES: usize = LEAF_OFF_RIGHT_SIB + 4;

/// Max entries a leaf of key width `w` can hold.
pub fn leaf_capacity(w: usize) -> usize {
    let entry_size = w + RECORD_ID_WIDTH;
    (crate::storage::page::PAGE_SIZE - LEAF_OFF_ENTRIES) / entry_size
}

fn leaf_entry_offset(w: usize, idx: usize) -> usize {
    LEAF_OFF_ENTRIES + idx * (w + RECORD_ID_WIDTH)
}

pub fn leaf_init(page: &mut Page, page_id: PageId, right_sib: PageId) {
    page.set_page_id(page_id);
    leaf_set_n(page, 0);
    leaf_set_right_sib(page, right_sib);
}

pub fn leaf_n(page: &Page) -> usize {
    u16::from_le_bytes(page.as_bytes()[LEAF_OFF_N..LEAF_OFF_N + 2].try_into().unwrap()) as usize
}

pub fn leaf_set_n(page: &mut Page, n: usize) {
    page.as_bytes_mut()[LEAF_OFF_N..LEAF_OFF_N + 2].copy_from_slice(&(n as u16).to_le_bytes());
}

pub fn leaf_right_sib(page: &Page) -> PageId {
    u32::from_le_bytes(page.as_bytes()[LEAF_OFF_RIGHT_SIB..LEAF_OFF_RIGHT_SIB + 4].try_into().unwrap())
}

pub fn leaf_set_right_sib(page: &mut Page, sib: PageId) {
    page.as_bytes_mut()[LEAF_OFF_RIGHT_SIB..LEAF_OFF_RIGHT_SIB + 4].copy_from_slice(&sib.to_le_bytes());
}

pub fn leaf_key<K: IndexKey>(page: &Page, idx: usize) -> K {
    let off = leaf_entry_offset(K::WIDTH, idx);
    K::decode(&page.as_bytes()[off..off + K::WIDTH])
}

pub fn leaf_rid(page: &Page, w: usize, idx: usize) -> RecordId {
    let off = leaf_entry_offset(w, idx) + w;
    RecordId::from_bytes(&page.as_bytes()[off..off + RECORD_ID_WIDTH])
}

pub fn leaf_set_entry<K: IndexKey>(page: &mut Page, idx: usize, key: K, rid: RecordId) {
    let off = leaf_entry_offset(K::WIDTH, idx);
    let bytes = page.as_bytes_mut();
    key.encode(&mut bytes[off..off + K::WIDTH]);
    bytes[off + K::WIDTH..off + K::WIDTH + RECORD_ID_WIDTH].copy_from_slice(&rid.to_bytes());
}

/// Shift entries `[idx, n)` one slot to the right, then write `(key, rid)`
/// at `idx`. Caller is responsible for bumping `n` and checking capacity.
pub fn leaf_insert_at<K: IndexKey>(page: &mut Page, idx: usize, key: K, rid: RecordId) {
    let n = leaf_n(page);
    for i in (idx..n).rev() {
        let k = leaf_key::<K>(page, i);
        let r = leaf_rid(page, K::WIDTH, i);
        leaf_set_entry(page, i + 1, k, r);
    }
    leaf_set_entry(page, idx, key, rid);
    leaf_set_n(page, n + 1);
}

// ---------------------------------------------------------- Non-leaf nodes

const NONLEAF_OFF_K: usize = BODY_START;
const NONLEAF_OFF_LEVEL: usize = NONLEAF_OFF_K + 2;
const NONLEAF_OFF_ENTRIES: usize = NONLEAF_OFF_LEVEL + 4;

/// Max keys a non-leaf of key width `w` can hold (one extra child pointer
/// beyond the key count). Slot `i` (i in `[0, N]`) uniformly costs
/// `4 + w` bytes — a child pointer plus a key, even though the key half of
/// the last slot (index `N`) is never read. `N+1` slots of `4+w` bytes must
/// fit in the available body.
pub fn nonleaf_capacity(w: usize) -> usize {
    let avail = crate::storage::page::PAGE_SIZE - NONLEAF_OFF_ENTRIES;
    let slots = avail / (4 + w);
    slots.saturating_sub(1)
}

fn nonleaf_child_offset(w: usize, idx: usize) -> usize {
    NONLEAF_OFF_ENTRIES + idx * (4 + w)
}

pub fn nonleaf_init(page: &mut Page, page_id: PageId, level: u32) {
    page.set_page_id(page_id);
    nonleaf_set_k(page, 0);
    nonleaf_set_level(page, level);
}

pub fn nonleaf_k(page: &Page) -> usize {
    u16::from_le_bytes(page.as_bytes()[NONLEAF_OFF_K..NONLEAF_OFF_K + 2].try_into().unwrap()) as usize
}

pub fn nonleaf_set_k(page: &mut Page, k: usize) {
    page.as_bytes_mut()[NONLEAF_OFF_K..NONLEAF_OFF_K + 2].copy_from_slice(&(k as u16).to_le_bytes());
}

pub fn nonleaf_level(page: &Page) -> u32 {
    u32::from_le_bytes(page.as_bytes()[NONLEAF_OFF_LEVEL..NONLEAF_OFF_LEVEL + 4].try_into().unwrap())
}

pub fn nonleaf_set_level(page: &mut Page, level: u32) {
    page.as_bytes_mut()[NONLEAF_OFF_LEVEL..NONLEAF_OFF_LEVEL + 4].copy_from_slice(&level.to_le_bytes());
}

pub fn nonleaf_child(page: &Page, w: usize, idx: usize) -> PageId {
    let off = nonleaf_child_offset(w, idx);
    u32::from_le_bytes(page.as_bytes()[off..off + 4].try_into().unwrap())
}

pub fn nonleaf_set_child(page: &mut Page, w: usize, idx: usize, child: PageId) {
    let off = nonleaf_child_offset(w, idx);
    page.as_bytes_mut()[off..off + 4].copy_from_slice(&child.to_le_bytes());
}

pub fn nonleaf_key<K: IndexKey>(page: &Page, idx: usize) -> K {
    let off = nonleaf_child_offset(K::WIDTH, idx) + 4;
    K::decode(&page.as_bytes()[off..off + K::WIDTH])
}

pub fn nonleaf_set_key<K: IndexKey>(page: &mut Page, idx: usize, key: K) {
    let off = nonleaf_child_offset(K::WIDTH, idx) + 4;
    key.encode(&mut page.as_bytes_mut()[off..off + K::WIDTH]);
}

/// Insert new routing key `key` at `child_idx`, with `right_child` becoming
/// `childPageIds[child_idx+1]`. `childPageIds[child_idx]` (the child that
/// just split) is left untouched; everything from `child_idx` on (keys) and
/// `child_idx+1` on (children) shifts right by one slot. Caller bumps `k`.
///
/// Slot `i` stores the pair `(childPageIds[i], keys[i])`, so `keys[i]`
/// separates `childPageIds[i]` (left, `≤ keys[i]`) from `childPageIds[i+1]`
/// (right, `> keys[i]`) — matching the non-leaf invariant directly.
pub fn nonleaf_insert_at<K: IndexKey>(
    page: &mut Page,
    w: usize,
    child_idx: usize,
    key: K,
    right_child: PageId,
) {
    let k = nonleaf_k(page);
    for i in (child_idx..k).rev() {
        let ky = nonleaf_key::<K>(page, i);
        nonleaf_set_key(page, i + 1, ky);
    }
    for i in (child_idx + 1..=k).rev() {
        let c = nonleaf_child(page, w, i);
        nonleaf_set_child(page, w, i + 1, c);
    }
    nonleaf_set_key(page, child_idx, key);
    nonleaf_set_child(page, w, child_idx + 1, right_child);
    nonleaf_set_k(page, k + 1);
}

/// Is `page`'s kind discriminator `NonLeaf`?
pub fn is_nonleaf(page: &Page) -> bool {
    matches!(page.kind(), Some(PageFlags::Internal))
}

/// Is `page`'s kind discriminator `Leaf`?
pub fn is_leaf(page: &Page) -> bool {
    matches!(page.kind(), Some(PageFlags::Leaf))
}

pub const NONE: PageId = NO_PAGE;
