use std::collections::HashMap;

use crate::models::{CompletionResult, Message, TranslatedEntry};

/**
 * \brief 将后端返回的文本归一化为条目列表。
 * \details ID 取自请求中最后一条消息的 `"<id>: ..."` 行，而非模型输出。
 *          若补全文本回答了任一请求 ID，则逐 ID 取对应行内容，未回答的 ID 不产出
 *          条目；否则整段补全文本原样对应到每个 ID。无冒号或 ID 非整数的行直接跳过。
 * \param messages 调用方原始消息
 * \param content  后端返回的补全文本
 */
pub fn parse_response(messages: &[Message], content: &str) -> CompletionResult {
    let Some(last) = messages.last() else {
        return CompletionResult::empty();
    };

    let answered = numbered_lines(content)
        .into_iter()
        .fold(HashMap::new(), |mut acc, (id, text)| {
            acc.entry(id).or_insert(text);
            acc
        });

    let requested: Vec<i64> = numbered_lines(&last.content)
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let per_id = requested.iter().any(|id| answered.contains_key(id));

    let translations = requested
        .into_iter()
        .filter_map(|entry_id| {
            let text = if per_id {
                answered.get(&entry_id)?.to_string()
            } else {
                content.to_string()
            };
            Some(TranslatedEntry {
                entry_id,
                translated_text: text,
            })
        })
        .collect();

    CompletionResult {
        translations,
        backend: None,
    }
}

fn numbered_lines(text: &str) -> Vec<(i64, &str)> {
    text.split('\n')
        .filter_map(|line| {
            let (id_part, rest) = line.split_once(':')?;
            let id = id_part.trim().parse::<i64>().ok()?;
            Some((id, rest.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_and_texts(result: &CompletionResult) -> Vec<(i64, String)> {
        result
            .iter()
            .map(|e| (e.entry_id, e.translated_text.clone()))
            .collect()
    }

    #[test]
    fn test_broadcasts_completion_to_every_numbered_line() {
        let messages = vec![
            Message::system("translate"),
            Message::user("1: hola\n2: mundo\nignored line\n3: bad:format"),
        ];
        let result = parse_response(&messages, "ALL");
        assert_eq!(
            ids_and_texts(&result),
            vec![
                (1, "ALL".to_string()),
                (2, "ALL".to_string()),
                (3, "ALL".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_integer_ids_are_skipped() {
        let messages = vec![Message::user("x: foo\n 7 : seven\n: nothing\n4.5: half")];
        let result = parse_response(&messages, "done");
        assert_eq!(ids_and_texts(&result), vec![(7, "done".to_string())]);
    }

    #[test]
    fn test_ids_come_from_last_message_only() {
        let messages = vec![
            Message::user("1: first turn"),
            Message::assistant("1: reply"),
            Message::user("2: second turn"),
        ];
        let result = parse_response(&messages, "text");
        assert_eq!(ids_and_texts(&result), vec![(2, "text".to_string())]);
    }

    #[test]
    fn test_matching_numbered_line_in_completion_is_used() {
        let messages = vec![Message::user("1: hello")];
        let result = parse_response(&messages, "1: bonjour");
        assert_eq!(ids_and_texts(&result), vec![(1, "bonjour".to_string())]);
    }

    #[test]
    fn test_partial_answer_leaves_out_unanswered_ids() {
        let messages = vec![Message::user("Translate to Polish:\n1: hello\n2: world\n3: again")];
        let result = parse_response(&messages, "Sure:\n3: znowu\n1: cześć\n7: extra");
        assert_eq!(
            ids_and_texts(&result),
            vec![(1, "cześć".to_string()), (3, "znowu".to_string())]
        );
    }

    #[test]
    fn test_unrelated_numbered_lines_still_broadcast() {
        let messages = vec![Message::user("1: hello\n2: world")];
        let result = parse_response(&messages, "5: five\nrest");
        assert_eq!(
            ids_and_texts(&result),
            vec![(1, "5: five\nrest".to_string()), (2, "5: five\nrest".to_string())]
        );
    }

    #[test]
    fn test_no_messages_yields_empty_result() {
        let result = parse_response(&[], "anything");
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let messages = vec![Message::user("3: c\n1: a\n2: b")];
        let first = parse_response(&messages, "trois\nun\ndeux");
        let second = parse_response(&messages, "trois\nun\ndeux");
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|e| e.entry_id).collect::<Vec<_>>(),
            vec![3, 1, 2]
        );
    }
}
