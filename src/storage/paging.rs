//! 分页遍历策略 / Pagination traversal strategies
//!
//! 三种后端分页风格归一到一个遍历循环
//! The three backend paging styles normalized behind one traversal loop:
//! - Offset: 请求(start, start+limit)，按总数推进 / request (start, start+limit), advance by total count
//! - Numbered: 请求(pageNum, pageSize)，按总数推进 / request (pageNum, pageSize), advance by total count
//! - Token: 不透明前向游标，空游标即结束 / opaque forward cursor, empty cursor terminates

use std::future::Future;

use super::error::{DriverError, Result};

/// 单次遍历的游标状态，不跨遍历共享 / Cursor state local to one traversal, never shared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Offset { start: i64, limit: i64 },
    Numbered { page_num: i64, page_size: i64 },
    Token { cursor: String, page_size: i64 },
}

/// 一页响应携带的推进信息 / Advance information carried by one page response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTurn {
    /// 服务端报告的条目总数 / Total entry count reported by the server
    Total(i64),
    /// 下一页游标，空串表示结束 / Next cursor, empty string terminates
    Next(String),
}

/// 一页条目及其推进信息 / One page of items plus its advance information
pub struct Page<T> {
    pub items: Vec<T>,
    pub turn: PageTurn,
}

impl PageCursor {
    /// 根据本页推进信息计算下一游标，None表示遍历结束
    /// Compute the next cursor from this page's turn; None ends the traversal.
    pub fn advance(self, turn: &PageTurn) -> Result<Option<PageCursor>> {
        match (self, turn) {
            (PageCursor::Offset { start, limit }, PageTurn::Total(total)) => {
                if start + limit >= *total {
                    Ok(None)
                } else {
                    Ok(Some(PageCursor::Offset { start: start + limit, limit }))
                }
            }
            (PageCursor::Numbered { page_num, page_size }, PageTurn::Total(total)) => {
                if page_size * page_num > *total {
                    Ok(None)
                } else {
                    Ok(Some(PageCursor::Numbered { page_num: page_num + 1, page_size }))
                }
            }
            (PageCursor::Token { page_size, .. }, PageTurn::Next(next)) => {
                if next.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(PageCursor::Token { cursor: next.clone(), page_size }))
                }
            }
            _ => Err(DriverError::Parse("page turn does not match cursor style".to_string())),
        }
    }
}

/// 按游标拉完整个目录，保持服务端顺序；任何一页出错则整体失败，已收集页被丢弃
/// Drain a full listing by cursor, preserving server order; any failing page
/// fails the whole traversal and collected pages are discarded.
pub async fn drain<T, F, Fut>(first: PageCursor, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor = Some(first);

    while let Some(current) = cursor {
        let page = fetch(current.clone()).await?;
        items.extend(page.items);
        cursor = current.advance(&page.turn)?;
    }

    Ok(items)
}
