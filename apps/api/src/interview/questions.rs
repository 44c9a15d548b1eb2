//! Question sourcing: model-generated with tips, falling back to a built-in bank.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::interview::models::{Question, QuestionTips, RoundType};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{parse_json_object, ChatMessage, Completer, CompletionOptions};

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 10;

/// `None` is "AI recommends": the per-round-type default.
pub fn resolve_count(round_type: RoundType, requested: Option<u32>) -> u32 {
    requested
        .map(|n| n.clamp(MIN_QUESTIONS, MAX_QUESTIONS))
        .unwrap_or_else(|| round_type.recommended_count())
}

const GENERATION_PROMPT: &str = r#"请为一场「{round}」模拟面试生成 {count} 道面试题，难度循序渐进。
{context}
每道题附带答题提示。严格按以下 JSON 输出：
{
  "questions": [
    {
      "question": "题目",
      "tips": {
        "intent": "面试官的考察意图",
        "keyPoints": ["回答要点"],
        "framework": "推荐的回答结构",
        "industryNotes": "行业相关提示（可选）",
        "pitfalls": ["常见误区"],
        "proTips": ["加分技巧"]
      }
    }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    #[serde(default, alias = "text")]
    question: String,
    #[serde(default)]
    tips: QuestionTips,
}

/// Questions for a round. Model output that is short, malformed, or missing is
/// topped up from the bank, so exactly `count` questions come back.
pub async fn generate_questions(
    completer: &dyn Completer,
    options: &CompletionOptions,
    round_type: RoundType,
    count: u32,
    context: Option<&str>,
) -> Vec<Question> {
    let prompt = GENERATION_PROMPT
        .replace("{round}", round_type.label())
        .replace("{count}", &count.to_string())
        .replace(
            "{context}",
            &context
                .map(|c| format!("候选人背景：{c}"))
                .unwrap_or_default(),
        );
    let messages = [ChatMessage::system(JSON_ONLY_SYSTEM), ChatMessage::user(prompt)];

    let generated = match completer.complete(&messages, options).await {
        Ok(raw) => parse_generated(&raw),
        Err(e) => {
            warn!("Question generation for {} failed, using bank: {e}", round_type.label());
            Vec::new()
        }
    };
    debug!(
        "Generated {} of {count} {} questions",
        generated.len(),
        round_type.label()
    );

    let prefix = Utc::now().timestamp_millis();
    generated
        .into_iter()
        .chain(bank(round_type))
        .take(count as usize)
        .enumerate()
        .map(|(index, (text, tips))| Question::new(format!("q_{prefix}_{index}"), text, tips))
        .collect()
}

fn parse_generated(raw: &str) -> Vec<(String, QuestionTips)> {
    let list = match parse_json_object(raw) {
        Some(Value::Object(mut object)) => object.remove("questions"),
        _ => None,
    };
    let Some(Value::Array(items)) = list else {
        warn!("Question generation output had no questions array");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<GeneratedQuestion>(item).ok())
        .filter(|q| !q.question.trim().is_empty())
        .map(|q| (q.question, q.tips))
        .collect()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn tips(
    intent: &str,
    key_points: &[&str],
    framework: &str,
    pitfalls: &[&str],
    pro_tips: &[&str],
) -> QuestionTips {
    QuestionTips {
        intent: intent.to_string(),
        key_points: owned(key_points),
        framework: framework.to_string(),
        industry_notes: None,
        pitfalls: owned(pitfalls),
        pro_tips: owned(pro_tips),
    }
}

/// Built-in questions for a round type, followed by general ones. Always holds
/// at least `MAX_QUESTIONS` entries.
pub fn bank(round_type: RoundType) -> Vec<(String, QuestionTips)> {
    let specific = match round_type {
        RoundType::Technical => vec![
            (
                "请介绍一个你主导过的技术方案，你是如何做技术选型的？",
                tips(
                    "考察技术深度与决策能力",
                    &["业务背景", "备选方案对比", "最终取舍与结果"],
                    "背景 → 方案对比 → 决策依据 → 结果复盘",
                    &["只罗列技术名词", "没有说明取舍理由"],
                    &["用数据说明方案带来的收益"],
                ),
            ),
            (
                "遇到过最棘手的线上问题是什么？你是如何定位和解决的？",
                tips(
                    "考察排障思路与抗压能力",
                    &["现象", "定位过程", "根因", "修复与预防"],
                    "STAR 法则",
                    &["跳过定位过程直接讲结论"],
                    &["补充事后做的监控或流程改进"],
                ),
            ),
            (
                "如果系统流量突然增长十倍，你会从哪些方面保障稳定性？",
                tips(
                    "考察系统设计与全局视角",
                    &["容量评估", "限流降级", "缓存与扩容", "监控告警"],
                    "先评估瓶颈，再分层给出方案",
                    &["只谈单一手段"],
                    &["结合自己做过的压测经验"],
                ),
            ),
            (
                "你如何保证自己交付代码的质量？",
                tips(
                    "考察工程素养",
                    &["测试策略", "代码评审", "持续集成"],
                    "流程 + 工具 + 实例",
                    &["只说“我很仔细”"],
                    &["举一个通过测试提前发现问题的例子"],
                ),
            ),
            (
                "最近学习的一项新技术是什么？你是如何把它用到工作中的？",
                tips(
                    "考察学习能力与技术热情",
                    &["学习动机", "学习方法", "落地效果"],
                    "为什么学 → 怎么学 → 用在哪",
                    &["只停留在看过文档"],
                    &["说明它解决了什么实际问题"],
                ),
            ),
            (
                "说说你对数据结构和算法在日常开发中作用的理解。",
                tips(
                    "考察基础功底",
                    &["具体场景", "复杂度意识"],
                    "观点 + 例子",
                    &["空谈理论"],
                    &["举一个优化复杂度带来性能提升的例子"],
                ),
            ),
        ],
        RoundType::Business => vec![
            (
                "请介绍一个你负责的项目，你在其中的角色和取得的成果是什么？",
                tips(
                    "考察项目经历的真实性与贡献度",
                    &["项目背景", "个人职责", "关键动作", "量化成果"],
                    "STAR 法则",
                    &["用“我们”掩盖个人贡献", "没有结果数据"],
                    &["突出一个最能体现能力的关键决策"],
                ),
            ),
            (
                "你是如何发现并理解用户需求的？",
                tips(
                    "考察用户洞察能力",
                    &["调研方法", "需求分析", "优先级判断"],
                    "方法 → 发现 → 决策 → 验证",
                    &["把用户说的等同于用户要的"],
                    &["讲一个你挖掘出隐性需求的例子"],
                ),
            ),
            (
                "讲一个你用数据分析驱动决策的例子。",
                tips(
                    "考察数据思维",
                    &["指标定义", "分析过程", "决策与结果"],
                    "问题 → 指标 → 分析 → 行动 → 效果",
                    &["只展示数据不给结论"],
                    &["说明你如何排除干扰因素"],
                ),
            ),
            (
                "如果产品的核心指标突然下滑，你会怎么排查？",
                tips(
                    "考察结构化分析能力",
                    &["数据校验", "维度拆解", "内外部因素"],
                    "先确认数据，再逐层拆解",
                    &["直接下结论"],
                    &["给出拆解的优先顺序"],
                ),
            ),
            (
                "你如何看待我们所在行业未来两到三年的发展？",
                tips(
                    "考察行业理解与思考深度",
                    &["行业趋势", "竞争格局", "机会与风险"],
                    "现状 → 趋势 → 对公司的启示",
                    &["泛泛而谈"],
                    &["结合公司业务给出具体观点"],
                ),
            ),
            (
                "需求冲突时你如何确定优先级？",
                tips(
                    "考察判断与沟通能力",
                    &["评估标准", "利益相关方沟通"],
                    "标准 + 案例",
                    &["只说“听老板的”"],
                    &["提到你用过的优先级模型"],
                ),
            ),
        ],
        RoundType::Behavioral => vec![
            (
                "讲一次你和同事意见不一致的经历，最后是怎么解决的？",
                tips(
                    "考察沟通协作与冲突处理",
                    &["分歧点", "沟通方式", "结果与反思"],
                    "STAR 法则",
                    &["贬低对方"],
                    &["体现对事不对人"],
                ),
            ),
            (
                "描述一次你在压力很大的情况下完成任务的经历。",
                tips(
                    "考察抗压与时间管理",
                    &["压力来源", "应对策略", "结果"],
                    "STAR 法则",
                    &["只描述辛苦不讲方法"],
                    &["说明你如何拆解和排期"],
                ),
            ),
            (
                "讲一个你失败的经历，你从中学到了什么？",
                tips(
                    "考察复盘与成长意识",
                    &["失败原因", "承担责任", "后续改进"],
                    "经历 → 原因 → 改变",
                    &["把失败归咎于他人", "选一个不算失败的例子"],
                    &["展示之后如何避免同类问题"],
                ),
            ),
            (
                "你主动推动过哪些超出职责范围的事情？",
                tips(
                    "考察主动性与影响力",
                    &["发现问题", "推动过程", "影响"],
                    "STAR 法则",
                    &["夸大个人作用"],
                    &["体现你如何争取资源"],
                ),
            ),
            (
                "你是如何快速适应一个新团队或新领域的？",
                tips(
                    "考察学习与适应能力",
                    &["学习方法", "建立关系", "产出"],
                    "方法 + 例子",
                    &["只说性格开朗"],
                    &["给出适应后的第一个成果"],
                ),
            ),
            (
                "讲一次你带领或影响团队达成目标的经历。",
                tips(
                    "考察领导力",
                    &["目标设定", "分工协作", "结果"],
                    "STAR 法则",
                    &["把领导力等同于职位"],
                    &["说明你如何激励他人"],
                ),
            ),
        ],
        RoundType::Hr => vec![
            (
                "为什么考虑离开现在的公司？",
                tips(
                    "考察求职动机与稳定性",
                    &["正向动机", "职业规划"],
                    "肯定过去 → 寻求成长 → 与岗位匹配",
                    &["抱怨前雇主"],
                    &["把原因落到新岗位能提供的机会上"],
                ),
            ),
            (
                "你未来三到五年的职业规划是什么？",
                tips(
                    "考察规划清晰度与匹配度",
                    &["短期目标", "长期方向", "与公司的结合"],
                    "近期 → 中期 → 长期",
                    &["规划与岗位无关"],
                    &["说明为实现规划正在做的准备"],
                ),
            ),
            (
                "你的期望薪资是多少？",
                tips(
                    "考察自我定位与谈判意识",
                    &["市场行情", "个人价值", "弹性空间"],
                    "给出区间并说明依据",
                    &["报一个具体数字且没有依据"],
                    &["先了解薪酬结构再谈具体数字"],
                ),
            ),
            (
                "你认为自己最大的优点和缺点是什么？",
                tips(
                    "考察自我认知",
                    &["与岗位相关的优点", "真实且在改进的缺点"],
                    "特质 + 例子",
                    &["把优点包装成缺点"],
                    &["说明改进缺点的具体行动"],
                ),
            ),
            (
                "你对我们公司有哪些了解？为什么想加入？",
                tips(
                    "考察求职诚意",
                    &["公司业务", "文化认同", "个人匹配"],
                    "了解 → 认同 → 匹配",
                    &["只背官网介绍"],
                    &["提到你使用过的产品或关注的动态"],
                ),
            ),
        ],
        RoundType::Final => vec![
            (
                "如果你入职这个岗位，前三个月会怎么开展工作？",
                tips(
                    "考察落地思路与岗位理解",
                    &["熟悉阶段", "快速产出", "长期规划"],
                    "30 / 60 / 90 天计划",
                    &["计划空泛"],
                    &["给出一个可量化的早期目标"],
                ),
            ),
            (
                "你认为这个岗位最大的挑战是什么？你准备如何应对？",
                tips(
                    "考察岗位认知深度",
                    &["挑战识别", "应对策略", "相关经验"],
                    "挑战 → 策略 → 佐证",
                    &["回避问题"],
                    &["结合自身经历证明能力"],
                ),
            ),
            (
                "在你的职业经历中，最有成就感的一件事是什么？",
                tips(
                    "考察价值观与驱动力",
                    &["事件", "你的贡献", "成就感来源"],
                    "STAR 法则",
                    &["只讲结果不讲过程"],
                    &["体现与公司价值观的契合"],
                ),
            ),
            (
                "你还有什么问题想问我们吗？",
                tips(
                    "考察思考深度与求职诚意",
                    &["团队", "业务方向", "成长路径"],
                    "准备两到三个有深度的问题",
                    &["说“没有问题”", "一上来就问福利"],
                    &["问团队当前最大的挑战"],
                ),
            ),
        ],
    };

    let general = [
        (
            "请用三分钟做一个自我介绍。",
            tips(
                "考察表达能力与经历匹配度",
                &["教育与工作背景", "核心能力", "求职动机"],
                "我是谁 → 我做过什么 → 我为什么适合",
                &["流水账式复述简历"],
                &["挑与岗位最相关的一两段经历重点讲"],
            ),
        ),
        (
            "你如何衡量自己工作的成果？",
            tips(
                "考察目标意识",
                &["指标", "复盘方式"],
                "指标 + 例子",
                &["没有量化标准"],
                &["引用一次复盘带来的改进"],
            ),
        ),
        (
            "你在团队中通常扮演什么角色？",
            tips(
                "考察团队定位",
                &["角色", "协作方式", "例子"],
                "角色 + 例子",
                &["只说“都可以”"],
                &["说明角色如何随团队需要变化"],
            ),
        ),
        (
            "如果工作中出现了你不熟悉的任务，你会怎么做？",
            tips(
                "考察学习与求助能力",
                &["拆解任务", "获取资源", "复盘沉淀"],
                "步骤化回答",
                &["只说会努力"],
                &["举一个快速上手的例子"],
            ),
        ),
        (
            "你最欣赏的一款产品或一家公司是什么？为什么？",
            tips(
                "考察洞察与审美",
                &["具体对象", "欣赏原因", "可借鉴之处"],
                "对象 → 原因 → 启发",
                &["只说好用"],
                &["结合应聘岗位谈启发"],
            ),
        ),
        (
            "讲讲你做过的一次复盘，带来了什么改变？",
            tips(
                "考察反思能力",
                &["复盘对象", "发现", "改进"],
                "STAR 法则",
                &["复盘流于形式"],
                &["说明改变带来的量化效果"],
            ),
        ),
    ];

    specific
        .into_iter()
        .chain(general)
        .map(|(text, tips)| (text.to_string(), tips))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::test_support::{chat_options, ScriptedCompleter};

    #[test]
    fn test_resolve_count() {
        assert_eq!(resolve_count(RoundType::Technical, None), 5);
        assert_eq!(resolve_count(RoundType::Hr, None), 3);
        assert_eq!(resolve_count(RoundType::Business, Some(0)), 1);
        assert_eq!(resolve_count(RoundType::Business, Some(42)), 10);
        assert_eq!(resolve_count(RoundType::Business, Some(7)), 7);
    }

    #[test]
    fn test_bank_covers_the_maximum_count() {
        for round_type in RoundType::ALL {
            assert!(bank(round_type).len() >= MAX_QUESTIONS as usize);
        }
    }

    #[tokio::test]
    async fn test_model_questions_are_used_then_topped_up() {
        let completer = ScriptedCompleter::new(|_, _| {
            Ok(r#"{"questions": [{"question": "解释一下 CAP 定理", "tips": {"intent": "分布式基础", "keyPoints": ["一致性"]}}]}"#.to_string())
        });
        let questions =
            generate_questions(&completer, &chat_options(), RoundType::Technical, 3, None).await;
        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].text, "解释一下 CAP 定理");
        assert_eq!(questions[0].tips.key_points, vec!["一致性".to_string()]);
        assert_eq!(questions[1].text, bank(RoundType::Technical)[0].0);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_bank() {
        let completer = ScriptedCompleter::new(|_, _| Err(LlmError::EmptyContent));
        let questions =
            generate_questions(&completer, &chat_options(), RoundType::Hr, 10, Some("产品经理")).await;
        assert_eq!(questions.len(), 10);
        let ids: std::collections::HashSet<_> = questions.iter().map(|q| &q.id).collect();
        assert_eq!(ids.len(), 10);
    }
}
