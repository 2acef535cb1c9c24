//! Instruction prompts and user-facing messages, keyed by language.
//!
//! Every prompt lives in one table keyed by `(AnalysisTask, Language)` and
//! every user-facing message in one table keyed by [`Language`]. Handlers
//! never branch on language themselves; they look the text up here.
//!
//! A task without a translated prompt falls back to English. The JSON
//! prompts are English-only on purpose: the keys of the returned document
//! must not vary with the caller's language.

use crate::config::{AnalysisTask, Language};
use once_cell::sync::Lazy;
use std::collections::HashMap;

const VIDEO_REPORT_EN: &str = r#"As an expert video analyst, please analyze this video comprehensively and provide a structured output following these guidelines:

1. Content Analysis:
   - Main topic and key themes
   - Key points and insights
   - Important timestamps and events
   - Visual elements and their significance

2. Technical Analysis:
   - Visual quality assessment
   - Audio clarity (if present)
   - Production elements used
   - Technical recommendations

3. Knowledge Extraction:
   - Core concepts explained
   - Technical terms used
   - Methodologies presented
   - Data points mentioned

4. Educational Assessment:
   - Create 5 expert-level questions
   - Provide detailed answers
   - Include explanation for each answer
   - Add difficulty level for each question

Please format the output in a clear, structured manner using markdown for better readability."#;

const VIDEO_REPORT_AR: &str = r#"كمحلل فيديو خبير، يرجى تحليل هذا الفيديو بشكل شامل وتقديم مخرجات منظمة وفقاً للإرشادات التالية:

1. تحليل المحتوى:
   - الموضوع الرئيسي والمحاور الأساسية
   - النقاط الرئيسية والرؤى
   - التوقيتات والأحداث المهمة
   - العناصر المرئية وأهميتها

2. التحليل التقني:
   - تقييم جودة الصورة
   - وضوح الصوت (إن وجد)
   - عناصر الإنتاج المستخدمة
   - التوصيات التقنية

3. استخراج المعرفة:
   - المفاهيم الأساسية الموضحة
   - المصطلحات التقنية المستخدمة
   - المنهجيات المقدمة
   - النقاط البيانية المذكورة

4. التقييم التعليمي:
   - إنشاء 5 أسئلة بمستوى متقدم
   - تقديم إجابات مفصلة
   - إضافة شرح لكل إجابة
   - تحديد مستوى الصعوبة لكل سؤال

يرجى تنسيق المخرجات بطريقة واضحة ومنظمة باستخدام markdown لسهولة القراءة.
الرجاء تقديم الإجابة باللغة العربية."#;

const VIDEO_JSON: &str = r#"Analyze this video and provide a detailed structured analysis in JSON format:

{
  "videoMetadata": {
    "mainTopic": "",
    "duration": "",
    "quality": "",
    "format": ""
  },
  "contentAnalysis": {
    "keyThemes": [],
    "mainPoints": [],
    "visualElements": [],
    "timestamps": []
  },
  "technicalDetails": {
    "visualQuality": "",
    "audioQuality": "",
    "productionElements": [],
    "technicalIssues": []
  },
  "detectedEntities": {
    "people": [],
    "objects": [],
    "text": [],
    "actions": []
  },
  "dataExtraction": {
    "statistics": [],
    "metrics": [],
    "keyFindings": []
  }
}

Please ensure the output is valid JSON and includes detailed information for each category."#;

const OBJECT_DETECTION: &str = r#"Analyze this image and provide detailed object detection results in JSON format. For each detected object, provide precise bounding box coordinates (x, y, width, height) relative to the image dimensions:

{
  "detectedObjects": [
    {
      "object": "name of object",
      "confidence": "confidence score (high/medium/low)",
      "location": {
        "x": number (left position),
        "y": number (top position),
        "width": number (width of box),
        "height": number (height of box)
      },
      "attributes": ["color", "size", "other relevant attributes"]
    }
  ],
  "sceneDescription": "overall scene description",
  "visualContext": {
    "lighting": "lighting conditions",
    "environment": "environment type",
    "composition": "composition details"
  },
  "technicalDetails": {
    "imageQuality": "quality assessment",
    "colorProfile": "color profile details",
    "dominantColors": ["color1", "color2", "etc"]
  }
}

Ensure coordinates are provided as numbers relative to the image dimensions."#;

const CHART_INSIGHTS: &str = r#"Carefully analyze this image and provide detailed insights if it contains any of the following:
- Flowcharts
- Tables
- Bar charts
- Line charts
- Pie charts
- Scatter plots
- Data visualizations
- Statistical charts

If the image contains any type of chart or data visualization, provide:
1. Chart type identification
2. Data structure and organization
3. Key insights and patterns
4. Potential improvements or clarifications

If the image does not contain any recognizable chart or data visualization, respond with "No chart or data visualization detected""#;

const FLOWCHART_TO_CODE: &str = r#"Analyze this flowchart image and convert it into Python code. Follow these steps:
1. Identify all flowchart elements (start/end, processes, decisions, inputs/outputs)
2. Map flowchart elements to appropriate Python constructs
3. Generate clean, well-structured Python code
4. Include comments explaining each part of the code
5. Ensure proper indentation and Python syntax

If the image does not contain a flowchart, respond with "No flowchart detected""#;

const TRANSLATE_AR: &str = r#"قم بترجمة النص التالي إلى اللغة العربية بشكل احترافي.
قواعد مهمة:
1. الحفاظ على التنسيق والهيكل
2. الحفاظ على المصطلحات التقنية واضحة ودقيقة
3. استخدام اللغة العربية الفصحى
4. الحفاظ على القوائم والأرقام والرموز الخاصة
5. عدم تغيير أي نصوص برمجية أو محتوى تقني

النص المراد ترجمته:
"#;

const TRANSLATE_EN: &str = r#"Translate the following text into English.
Rules:
1. Keep the formatting and structure
2. Keep technical terms clear and accurate
3. Keep lists, numbers and special symbols unchanged
4. Do not alter code or other technical content

Text to translate:
"#;

static INSTRUCTIONS: Lazy<HashMap<(AnalysisTask, Language), &'static str>> = Lazy::new(|| {
    HashMap::from([
        ((AnalysisTask::VideoReport, Language::En), VIDEO_REPORT_EN),
        ((AnalysisTask::VideoReport, Language::Ar), VIDEO_REPORT_AR),
        ((AnalysisTask::YoutubeReport, Language::En), VIDEO_REPORT_EN),
        ((AnalysisTask::YoutubeReport, Language::Ar), VIDEO_REPORT_AR),
        ((AnalysisTask::VideoJson, Language::En), VIDEO_JSON),
        ((AnalysisTask::ObjectDetection, Language::En), OBJECT_DETECTION),
        ((AnalysisTask::ChartInsights, Language::En), CHART_INSIGHTS),
        ((AnalysisTask::FlowchartToCode, Language::En), FLOWCHART_TO_CODE),
    ])
});

static TRANSLATIONS: Lazy<HashMap<Language, &'static str>> =
    Lazy::new(|| HashMap::from([(Language::Ar, TRANSLATE_AR), (Language::En, TRANSLATE_EN)]));

/// Instruction text for a task, in the requested language when available.
pub fn instruction(task: AnalysisTask, language: Language) -> &'static str {
    INSTRUCTIONS
        .get(&(task, language))
        .or_else(|| INSTRUCTIONS.get(&(task, Language::En)))
        .copied()
        .unwrap_or_default()
}

/// Preamble prepended to the text being translated into `target`.
pub fn translation_prompt(target: Language) -> &'static str {
    TRANSLATIONS.get(&target).copied().unwrap_or(TRANSLATE_EN)
}

/// Prefix naming the video when only its thumbnail is sent to the model.
pub fn youtube_preamble(url: &str) -> String {
    format!("Please analyze this YouTube video ({})\n\n", url)
}

// ── User-facing messages ─────────────────────────────────────────────────

/// Messages returned to callers, one set per language.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub no_image: &'static str,
    pub no_video: &'static str,
    pub no_url: &'static str,
    pub no_text: &'static str,
    pub invalid_video_url: &'static str,
    pub image_too_large: &'static str,
    pub video_too_large: &'static str,
    pub unsupported_type: &'static str,
    pub undecodable_image: &'static str,
    pub wrong_media_kind: &'static str,
    pub missing_field: &'static str,
    pub invalid_handle: &'static str,
    pub invalid_json: &'static str,
    pub invalid_form: &'static str,
    pub request_too_large: &'static str,
    pub no_chart: &'static str,
    pub no_flowchart: &'static str,
    pub upload_failed: &'static str,
    pub processing_failed: &'static str,
    pub processing_timeout: &'static str,
    pub status_fetch_failed: &'static str,
    pub thumbnail_unavailable: &'static str,
    pub upstream_error: &'static str,
    pub internal_error: &'static str,
}

const MESSAGES_EN: Messages = Messages {
    no_image: "No image provided",
    no_video: "No video file provided",
    no_url: "No YouTube URL provided",
    no_text: "No text provided for translation",
    invalid_video_url: "Invalid YouTube URL",
    image_too_large: "Image size must be less than the upload limit",
    video_too_large: "Video size must be less than the upload limit",
    unsupported_type: "This file type is not supported",
    undecodable_image: "The image could not be read",
    wrong_media_kind: "This analysis does not accept this kind of media",
    missing_field: "A required field is missing",
    invalid_handle: "This is not a valid video handle",
    invalid_json: "The request body is not valid JSON",
    invalid_form: "The upload form could not be read",
    request_too_large: "The request body is too large",
    no_chart: "The uploaded image doesn't contain a recognizable chart or data visualization. Please upload an image with a clear chart or data visualization.",
    no_flowchart: "The uploaded image doesn't contain a recognizable flowchart. Please upload an image with a clear flowchart.",
    upload_failed: "Failed to upload the media for analysis",
    processing_failed: "Video processing failed",
    processing_timeout: "The video is still being processed. Please try again shortly.",
    status_fetch_failed: "Could not check the video's processing status. Please try again shortly.",
    thumbnail_unavailable: "Could not retrieve the video thumbnail",
    upstream_error: "The analysis service failed. Please try again.",
    internal_error: "Failed to process the request",
};

const MESSAGES_AR: Messages = Messages {
    no_image: "لم يتم تحديد صورة",
    no_video: "لم يتم تحديد ملف فيديو",
    no_url: "لم يتم تحديد رابط يوتيوب",
    no_text: "لم يتم توفير نص للترجمة",
    invalid_video_url: "رابط يوتيوب غير صالح",
    image_too_large: "يجب أن يكون حجم الصورة أقل من الحد المسموح",
    video_too_large: "يجب أن يكون حجم الفيديو أقل من الحد المسموح",
    unsupported_type: "نوع الملف غير مدعوم",
    undecodable_image: "تعذرت قراءة الصورة",
    wrong_media_kind: "هذا التحليل لا يقبل هذا النوع من الوسائط",
    missing_field: "حقل مطلوب مفقود",
    invalid_handle: "معرف الفيديو غير صالح",
    invalid_json: "محتوى الطلب ليس بصيغة JSON صالحة",
    invalid_form: "تعذرت قراءة نموذج الرفع",
    request_too_large: "حجم الطلب كبير جدا",
    no_chart: "الصورة المرفوعة لا تحتوي على رسم بياني واضح. يرجى رفع صورة تحتوي على رسم بياني أو تمثيل بيانات واضح.",
    no_flowchart: "الصورة المرفوعة لا تحتوي على مخطط انسيابي واضح. يرجى رفع صورة تحتوي على مخطط انسيابي.",
    upload_failed: "فشل رفع الملف للتحليل",
    processing_failed: "فشلت معالجة الفيديو",
    processing_timeout: "لا تزال معالجة الفيديو جارية. يرجى المحاولة بعد قليل.",
    status_fetch_failed: "تعذر التحقق من حالة معالجة الفيديو. يرجى المحاولة بعد قليل.",
    thumbnail_unavailable: "تعذر الحصول على الصورة المصغرة للفيديو",
    upstream_error: "حدث خطأ أثناء معالجة الفيديو",
    internal_error: "حدث خطأ أثناء معالجة الطلب",
};

static MESSAGES: Lazy<HashMap<Language, Messages>> =
    Lazy::new(|| HashMap::from([(Language::En, MESSAGES_EN), (Language::Ar, MESSAGES_AR)]));

/// Message set for a language, English when the language has none.
pub fn messages(language: Language) -> &'static Messages {
    MESSAGES.get(&language).unwrap_or(&MESSAGES_EN)
}
