//! Locale-specific prompt text.

use agora_config::Locale;

const MODERATOR_EN: &str = "\
{{pro}} will argue for, {{con}} will argue against. Let's explore {{topic}} together.

Do not give conclusions yet. List all potentially relevant variables \u{2014} exhaustive, unranked, uncategorized.
Each variable must include a source and date. Omit any without a source.

Beyond the direct variables of the topic itself, you must also cover:
- What is changing in the external environment surrounding this topic?
- What forces from adjacent domains could cross over and impact this topic?

After the exhaustive list, each side adds 5 variables the other side likely missed. Merge and deduplicate into the final variable set.";

const MODERATOR_ZH: &str = "\
{{pro}}作为正方，{{con}}作为反方，我们一起探讨{{topic}}。

先不要给结论。列出所有可能相关的变量，穷举，不排序，不归类。
每个变量标注来源和日期，没有来源的不要写。

穷举时，除了主题本身的直接变量，还必须覆盖：
- 主题所处的外部环境中，正在发生什么变化？
- 有哪些相邻领域的力量可能跨界影响这个主题？

穷举完成后，双方各自补充\"对方遗漏的 5 个变量\"，合并去重后作为最终变量集。";

const TURN_PROMPT_EN: &str = "\n\n--------\nYour turn, {{name}}. Stay on topic.";
const TURN_PROMPT_ZH: &str = "\n\n--------\n请{{name}}发言，注意不要跑题";

/// Prompt builder for one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptTemplates {
    locale: Locale,
}

impl PromptTemplates {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Opening brief; `pro` argues for `topic`, `con` against.
    pub fn moderator_message(&self, pro: &str, con: &str, topic: &str) -> String {
        let template = match self.locale {
            Locale::En => MODERATOR_EN,
            Locale::Zh => MODERATOR_ZH,
        };
        template
            .replace("{{pro}}", pro)
            .replace("{{con}}", con)
            .replace("{{topic}}", topic)
    }

    /// Suffix appended to a finished reply, handing the floor to `name`.
    pub fn turn_prompt(&self, name: &str) -> String {
        let template = match self.locale {
            Locale::En => TURN_PROMPT_EN,
            Locale::Zh => TURN_PROMPT_ZH,
        };
        template.replace("{{name}}", name)
    }

    /// Speaker label of the opening message.
    pub fn moderator_label(&self) -> &'static str {
        match self.locale {
            Locale::En => "Moderator",
            Locale::Zh => "主持人",
        }
    }
}
