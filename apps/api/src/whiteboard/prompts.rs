// Whiteboard extraction prompt templates.
// One schema per stage; `{transcript}` is replaced with the rendered conversation.

use crate::stages::Stage;

pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"下面是一段职业教练与用户的对话记录。请从中提取结构化信息。

对话记录：
{transcript}

输出格式（严格按照此结构返回一个 JSON 对象）：
{schema}

规则：
1. 只提取对话中明确出现的信息，不要推测或编造。
2. 没有相关信息的字段直接省略。
3. 只返回 JSON 对象本身，不要使用 markdown 代码块，不要附加任何解释。"#;

const CAREER_SCHEMA: &str = r#"{
  "intentRole": "用户的意向岗位，例如 产品经理",
  "keySkills": ["与意向岗位相关的核心技能"]
}"#;

const PROJECT_SCHEMA: &str = r#"{
  "starProjects": [
    {
      "name": "项目名称",
      "situation": "项目背景（S）",
      "task": "用户承担的任务（T）",
      "action": "用户采取的具体行动（A）",
      "result": "可量化的结果（R）",
      "skills": ["项目中体现的技能"]
    }
  ]
}"#;

const RESUME_SCHEMA: &str = r#"{
  "resumeInsights": [
    {
      "section": "简历段落，例如 工作经历 / 项目经历 / 个人总结",
      "original": "修改前的原文",
      "optimized": "优化后的表达",
      "reason": "修改理由"
    }
  ]
}"#;

const APPLICATION_SCHEMA: &str = r#"{
  "targetCompanies": [
    {
      "name": "公司名称",
      "position": "投递岗位",
      "priority": "冲刺 | 匹配 | 保底",
      "status": "待投递 | 已投递 | 面试中 | 已结束",
      "notes": "匹配点或备注"
    }
  ]
}
注意：targetCompanies 需要返回对话中提到的完整公司列表，而不仅是新增的公司。"#;

const INTERVIEW_SCHEMA: &str = r#"{
  "interviewReports": [
    {
      "round": "面试轮次，例如 技术面 / 行为面 / HR面",
      "questionCount": 0,
      "questions": [
        {"question": "面试题", "userAnswer": "用户的回答"}
      ],
      "overallScore": 0,
      "strengths": ["表现好的地方"],
      "improvements": ["需要改进的地方"],
      "suggestions": ["具体建议"]
    }
  ]
}"#;

const SALARY_SCHEMA: &str = r#"{
  "salaryStrategy": {
    "targetRange": "期望薪资区间，例如 25k-30k",
    "minimumAcceptable": "可接受的底线",
    "marketReference": "市场参考区间",
    "negotiationPoints": ["谈判筹码或话术要点"]
  }
}"#;

const OFFER_SCHEMA: &str = r#"{
  "offers": [
    {
      "company": "公司名称",
      "position": "岗位",
      "baseSalary": "月薪或年薪",
      "bonus": "奖金",
      "equity": "股票或期权",
      "benefits": ["福利"],
      "pros": ["优点"],
      "cons": ["缺点"],
      "deadline": "答复截止时间",
      "status": "考虑中 | 已接受 | 已拒绝"
    }
  ]
}
注意：offers 需要返回对话中提到的完整 Offer 列表，而不仅是新增的 Offer。"#;

/// Resume upload parsing: intent, skills and projects in one pass.
pub const RESUME_PARSE_SCHEMA: &str = r#"{
  "intentRole": "简历中体现的求职意向",
  "keySkills": ["技能"],
  "starProjects": [
    {
      "name": "项目名称",
      "situation": "背景",
      "task": "任务",
      "action": "行动",
      "result": "结果",
      "skills": ["技能"]
    }
  ]
}"#;

pub fn extraction_schema(stage: Stage) -> &'static str {
    match stage {
        Stage::CareerPlanning => CAREER_SCHEMA,
        Stage::ProjectReview => PROJECT_SCHEMA,
        Stage::ResumeOptimization => RESUME_SCHEMA,
        Stage::ApplicationStrategy => APPLICATION_SCHEMA,
        Stage::Interview => INTERVIEW_SCHEMA,
        Stage::SalaryTalk => SALARY_SCHEMA,
        Stage::Offer => OFFER_SCHEMA,
    }
}
