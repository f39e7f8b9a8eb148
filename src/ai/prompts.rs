//! Prompt templates sent to Gemini. Output formats here are what
//! [`super::parse`] expects back.

/// Article bodies longer than this are cut before being sent for tagging.
pub const TAG_SNIPPET_CHARS: usize = 2000;

const SEPARATOR: &str = "-----------------------";

const SUGGESTION_RULES: &str = "【厳格な制約】
- 「はい」「承知しました」「提案します」などの前置き文は絶対に出力しないこと
- 最初の文字は必ず「-----------------------」で始めること
- 記事タイトルは必ず「### 」で始める（Markdown見出しレベル3）
- 概要は「である」「だ」で終わる断定形のみ使用
- 「〜します」「〜ます」「〜ください」などの丁寧語・敬語は完全禁止
- 絵文字（📝など）も不要
- 「対象読者」などの追加情報も不要";

fn suggestion_format(count: usize) -> String {
    let mut format = String::from(SEPARATOR);
    for n in 1..=count {
        format.push_str(&format!(
            "\n### {n}. 記事タイトル\n概要：記事の内容説明。必ず「である」「だ」で終わる文章で記述する。\n{SEPARATOR}"
        ));
    }
    format
}

pub fn topics(count: usize, recent_titles: &[String]) -> String {
    let recent = if recent_titles.is_empty() {
        "なし".to_string()
    } else {
        recent_titles.join("、")
    };

    format!(
        "技術ブログのテーマを{count}つ提案する。以下のフォーマットで出力せよ。

【重要】前置き・挨拶文は一切不要。以下のフォーマットのみを出力すること。

{format}

{rules}

最近の投稿: {recent}",
        format = suggestion_format(count),
        rules = SUGGESTION_RULES,
    )
}

pub fn themed_topics(theme: &str, count: usize) -> String {
    format!(
        "「{theme}」に関する技術ブログのテーマを{count}つ提案する。以下のフォーマットで出力せよ。

【重要】前置き・挨拶文は一切不要。以下のフォーマットのみを出力すること。

{format}

{rules}",
        format = suggestion_format(count),
        rules = SUGGESTION_RULES,
    )
}

pub fn outline(title: &str) -> String {
    format!(
        "記事タイトル「{title}」の詳細なアウトラインを生成せよ。

【出力フォーマット】
以下の形式で必ず出力すること。前置きは一切不要。

[:contents]

## セクション1のタイトル
ここに書くべき内容の概要（2-3文）。具体的な技術要素や手順を示唆する。

## セクション2のタイトル
ここに書くべき内容の概要（2-3文）。実装方法やコード例の方向性を示す。

## セクション3のタイトル
ここに書くべき内容の概要（2-3文）。応用例やベストプラクティスに言及する。

## まとめ
ここに書くべき内容の概要（2-3文）。記事全体の要点と次のアクションを示す。

【厳格な制約】
- 最初は必ず「[:contents]」で始める（はてなブログの目次記法）
- 前置き文は絶対に出力しないこと
- セクションは「## 」で始める（Markdown見出しレベル2）
- 各セクションの下に、そのセクションで書くべき内容のヒントを2-3文で記述
- ヒントは具体的で、執筆の指針となる内容にすること
- 「である調」で記述すること
- 敬語（です・ます調）は禁止
- セクション数は3-5個が適切
- 最後に「まとめ」セクションを必ず含める
- 技術ブログとして実践的で読者に役立つ構成にすること"
    )
}

pub fn section(detail: &str) -> String {
    format!(
        "あなたは技術ブログを書くライターである。以下の口調・文体の特徴を厳密に守って記事を書くこと:

【口調の特徴】
- 敬語は使わない（である調、だ調）
- カジュアルで砕けた表現（「〜らしい」「〜みたいな」「〜的な」「というわけで」）
- 余計な前置きや挨拶は一切なし
- 端的で分かりやすい説明

【重要】
- 見出し(###で始まる)と本文のみを出力すること
- 「以下のような〜」「それでは〜」などの前置きは不要
- コードブロックは使わない（Markdown形式そのままで出力）
- 見出しは1つ、その下に本文を記述

【要求内容】
{detail}

上記の内容で、見出し(### )1つと、その下に本文を記述せよ。"
    )
}

pub fn answer(question: &str) -> String {
    format!(
        "あなたは技術に詳しいエンジニアである。以下の口調・文体の特徴を厳密に守って質問に回答すること:

【口調の特徴】
- 敬語は使わない（である調、だ調）
- カジュアルで砕けた表現（「〜らしい」「〜みたいな」「〜的な」「というわけで」）
- なるべく端的に、必要最小限の説明で
- 余計な前置きや挨拶は一切なし
- コードや技術用語は適切に使う

【重要】
- テキストのみで回答
- コードブロック(```)は使わない
- 前置きなしで本題から始める
- 端的に、必要十分な説明のみ

【質問内容】
{question}

上記の質問に対して、端的に回答せよ。"
    )
}

pub fn review(article: &str) -> String {
    format!(
        "以下のブログ記事をレビューして、改善提案を出してください。

# レビュー観点
1. **論理展開の正しさ**
   - 話の流れが自然につながっているか
   - 前提→説明→結論の流れが矛盾していないか
   - 因果関係が正しく説明されているか
   - 飛躍した論理や説明不足がないか

2. **初心者への分かりやすさ**
   - 専門用語を使う際に適切な説明があるか
   - 初めてその技術に触れる人でも理解できる表現か
   - 具体例やたとえ話が効果的に使われているか
   - 段階的に理解を深められる構成になっているか

3. **その他の改善点**
   - タイトルの魅力度
   - 見出し構成の適切さ
   - コード例の分かりやすさ（もしあれば）

# 記事本文
{article}

# レビュー結果
上記の観点から、具体的な改善提案を箇条書きで教えてください。
良い点も1-2個挙げてモチベーションを保ってください。
改善提案は優先度の高い順に並べてください。"
    )
}

pub fn tags(title: &str, content: &str) -> String {
    format!(
        "以下のブログ記事に最適なタグを5~10個提案してください。

# タグ生成の基準
- はてなブログでよく使われるタグを優先
- 技術系の記事の場合、具体的な技術名（Python、Discord、APIなど）
- 記事のテーマを表すキーワード
- SEO効果が高そうなキーワード
- 抽象的すぎず、具体的すぎないバランスの良いタグ

# 記事タイトル
{title}

# 記事本文（抜粋）
{snippet}

# 出力形式
タグをカンマ区切りで出力してください。余計な説明は不要です。
例: Python, Discord Bot, API連携, 自動化, プログラミング, 技術解説",
        snippet = truncate_chars(content, TAG_SNIPPET_CHARS),
    )
}

/// Cut at a character boundary, never inside a multi-byte sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
