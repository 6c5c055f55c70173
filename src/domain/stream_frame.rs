//! 流式协议帧解析
//!
//! 生成端点的响应是 `text/event-stream` 形状的文本流：
//! 每帧一行 `data: {"content": "<增量文本>"}`，以 `data: [DONE]` 收尾。
//! 网络分块边界与行边界无关，可能在一行中间切开，
//! 因此解析器跨 `feed` 调用保留未消费的行尾残余。

use serde_json::Value;

/// 协议帧前缀
pub const DATA_PREFIX: &str = "data: ";

/// 终止哨兵
pub const DONE_SENTINEL: &str = "[DONE]";

/// 一次 `feed` 解析出的帧集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBatch {
    /// 按出现顺序排列的增量文本（允许为空字符串）
    pub fragments: Vec<String>,
    /// 是否命中了终止哨兵
    pub done: bool,
}

/// 协议帧解析器
///
/// 不变量:
/// - 单个畸形帧只跳过，不终止整个流
/// - 命中哨兵后丢弃当前块剩余内容，之后的 `feed` 不再产出
#[derive(Debug, Default)]
pub struct FrameParser {
    /// 上一块未以换行结束的残余
    remainder: String,
    done: bool,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 喂入一个网络块（已解码为文本），返回其中完整行解析出的帧
    pub fn feed(&mut self, chunk: &str) -> FrameBatch {
        let mut batch = FrameBatch::default();
        if self.done {
            return batch;
        }

        self.remainder.push_str(chunk);
        while let Some(pos) = self.remainder.find('\n') {
            let line: String = self.remainder.drain(..=pos).collect();
            if parse_line(line.trim_end_matches(['\n', '\r']), &mut batch) {
                self.remainder.clear();
                self.done = true;
                batch.done = true;
                break;
            }
        }
        batch
    }

    /// 流自然结束时冲刷最后一个未换行的行
    pub fn finish(&mut self) -> FrameBatch {
        let mut batch = FrameBatch::default();
        if self.done || self.remainder.is_empty() {
            return batch;
        }

        let line = std::mem::take(&mut self.remainder);
        if parse_line(line.trim_end_matches(['\n', '\r']), &mut batch) {
            self.done = true;
            batch.done = true;
        }
        batch
    }
}

/// 解析单行，返回是否命中终止哨兵
fn parse_line(line: &str, batch: &mut FrameBatch) -> bool {
    // 空行、注释行等非 data 行直接忽略
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return false;
    };

    if payload == DONE_SENTINEL {
        return true;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => match value.get("content").and_then(Value::as_str) {
            Some(content) => batch.fragments.push(content.to_string()),
            None => {
                tracing::warn!(
                    payload_len = payload.len(),
                    "Data frame missing content field, skipped"
                );
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Malformed data frame payload, skipped");
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut FrameParser, chunks: &[&str]) -> (String, bool) {
        let mut text = String::new();
        let mut done = false;
        for chunk in chunks {
            let batch = parser.feed(chunk);
            text.extend(batch.fragments);
            done |= batch.done;
        }
        let batch = parser.finish();
        text.extend(batch.fragments);
        done |= batch.done;
        (text, done)
    }

    #[test]
    fn test_parses_content_frames_and_sentinel() {
        let mut parser = FrameParser::new();
        let (text, done) = feed_all(
            &mut parser,
            &["data: {\"content\":\"少年\"}\ndata: {\"content\":\"捡到断剑\"}\ndata: [DONE]\n"],
        );
        assert_eq!(text, "少年捡到断剑");
        assert!(done);
    }

    #[test]
    fn test_mid_line_chunk_split_reassembles() {
        // 分块边界切在一行中间，结果必须与单块投递一致
        let whole = "data: {\"content\":\"风雪夜\"}\ndata: [DONE]\n";
        let mut single = FrameParser::new();
        let expected = feed_all(&mut single, &[whole]);

        let mut split = FrameParser::new();
        let got = feed_all(&mut split, &["data: {\"con", "tent\":\"风雪", "夜\"}\nda", "ta: [DONE]\n"]);
        assert_eq!(got, expected);
    }

    #[test]
    fn test_malformed_frame_is_skipped_not_fatal() {
        let mut parser = FrameParser::new();
        let (text, done) = feed_all(
            &mut parser,
            &[
                "data: {\"content\":\"甲\"}\n",
                "data: {broken json\n",
                "data: {\"no_content\":1}\n",
                "data: {\"content\":\"乙\"}\n",
                "data: [DONE]\n",
            ],
        );
        assert_eq!(text, "甲乙");
        assert!(done);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut parser = FrameParser::new();
        let (text, _) = feed_all(
            &mut parser,
            &["\n: keep-alive\nevent: ping\ndata: {\"content\":\"丙\"}\n\n"],
        );
        assert_eq!(text, "丙");
    }

    #[test]
    fn test_sentinel_discards_rest_of_chunk() {
        let mut parser = FrameParser::new();
        let batch = parser.feed("data: [DONE]\ndata: {\"content\":\"不应出现\"}\n");
        assert!(batch.done);
        assert!(batch.fragments.is_empty());
        // 哨兵之后继续喂入也不再产出
        let batch = parser.feed("data: {\"content\":\"也不应出现\"}\n");
        assert_eq!(batch, FrameBatch::default());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut parser = FrameParser::new();
        assert!(parser.feed("data: {\"content\":\"尾行\"}").fragments.is_empty());
        let batch = parser.finish();
        assert_eq!(batch.fragments, vec!["尾行".to_string()]);
    }

    #[test]
    fn test_empty_content_fragment_is_kept() {
        let mut parser = FrameParser::new();
        let batch = parser.feed("data: {\"content\":\"\"}\n");
        assert_eq!(batch.fragments, vec![String::new()]);
    }

    #[test]
    fn test_crlf_lines() {
        let mut parser = FrameParser::new();
        let (text, done) = feed_all(&mut parser, &["data: {\"content\":\"丁\"}\r\ndata: [DONE]\r\n"]);
        assert_eq!(text, "丁");
        assert!(done);
    }
}
