// ==========================================
// 船期延误追踪系统 - HTML 表格切片
// ==========================================
// 门户页面的结构化表格提取, 大小写不敏感
// 范围: 只处理规整的 <table>/<tr>/<td> 嵌套, 不做完整 DOM 解析
// ==========================================

/// ASCII 小写化 (保留非 ASCII 字符)
fn ascii_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// 截取第一个匹配 marker 的 <table> 内部内容
///
/// # 参数
/// - doc: 完整 HTML 文档
/// - marker: 开标签匹配串, 如 "<table class=\"schedule-results\""
pub fn table_inner<'a>(doc: &'a str, marker: &str) -> Option<&'a str> {
    let lower = ascii_lower(doc);
    let open = lower.find(&ascii_lower(marker))?;
    let content_start = doc[open..].find('>')? + open + 1;
    let close = lower[content_start..].find("</table>")?;
    Some(&doc[content_start..content_start + close])
}

/// 定位下一个标签块 (含开闭标签), 返回 (起点, 终点)
fn next_block(s: &str, lower: &str, open: &str, close: &str, from: usize) -> Option<(usize, usize)> {
    let start = lower.get(from..)?.find(open)? + from;
    let content_start = s[start..].find('>')? + start + 1;
    let end_rel = lower[content_start..].find(close)?;
    Some((start, content_start + end_rel + close.len()))
}

/// 标签块去掉开闭标签后的内部内容
fn block_inner(block: &str) -> &str {
    match (block.find('>'), block.rfind('<')) {
        (Some(open_end), Some(close_start)) if close_start > open_end => {
            &block[open_end + 1..close_start]
        }
        _ => "",
    }
}

/// 表格内部 → 行块列表 (<tr> 内部内容)
pub fn row_blocks(table: &str) -> Vec<&str> {
    let lower = ascii_lower(table);
    let mut rows = Vec::new();
    let mut pos = 0usize;
    while let Some((start, end)) = next_block(table, &lower, "<tr", "</tr>", pos) {
        rows.push(block_inner(&table[start..end]));
        pos = end;
    }
    rows
}

/// 行块 → 单元格文本列表 (<td>/<th>, 去标签去实体)
pub fn cell_texts(row: &str) -> Vec<String> {
    let lower = ascii_lower(row);
    let mut cells = Vec::new();
    for tag in ["<td", "<th"] {
        let close = if tag == "<td" { "</td>" } else { "</th>" };
        let mut pos = 0usize;
        while let Some((start, end)) = next_block(row, &lower, tag, close, pos) {
            cells.push((start, strip_tags(block_inner(&row[start..end]))));
            pos = end;
        }
    }
    // td/th 混排按出现位置排序
    cells.sort_by_key(|(start, _)| *start);
    cells.into_iter().map(|(_, text)| text).collect()
}

/// 去标签 + 解码常见实体 + 压缩空白
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <html><body>
        <table class="other"><tr><td>noise</td></tr></table>
        <TABLE class="schedule-results">
          <tr><th>Field</th><th>Sailing 1</th></tr>
          <tr><td>Vessel</td><td><b>EVER&nbsp;GIVEN</b></td></tr>
        </TABLE>
        </body></html>"#;

    #[test]
    fn test_table_inner_case_insensitive() {
        let table = table_inner(DOC, r#"<table class="schedule-results""#).unwrap();
        assert!(table.contains("Vessel"));
        assert!(!table.contains("noise"));
    }

    #[test]
    fn test_rows_and_cells() {
        let table = table_inner(DOC, r#"<table class="schedule-results""#).unwrap();
        let rows = row_blocks(table);
        assert_eq!(rows.len(), 2);

        let header = cell_texts(rows[0]);
        assert_eq!(header, vec!["Field", "Sailing 1"]);

        let vessel_row = cell_texts(rows[1]);
        // 嵌套标签与实体都被清理
        assert_eq!(vessel_row, vec!["Vessel", "EVER GIVEN"]);
    }

    #[test]
    fn test_table_inner_missing() {
        assert!(table_inner(DOC, "<table id=\"absent\"").is_none());
    }
}
