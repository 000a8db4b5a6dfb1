//! Fixed answer text in English and Hindi.

use agriqa_core::Language;

/// Line the hybrid prompt asks the model to put between its two sections.
pub const GENERAL_KNOWLEDGE_MARKER: &str = "---GENERAL KNOWLEDGE---";

/// Localized strings used to frame answers.
#[derive(Debug, Clone, Copy)]
pub struct Texts {
    pub fallback_disclaimer: &'static str,
    pub hybrid_notice: &'static str,
    pub live_data_heading: &'static str,
    pub general_heading: &'static str,
    pub explanation_unavailable: &'static str,
    pub service_unavailable: &'static str,
    pub records_label: &'static str,
    pub sample_label: &'static str,
}

const EN: Texts = Texts {
    fallback_disclaimer: "⚠️ Note: Live data from data.gov.in is currently unavailable. The following answer is based on general knowledge, not live data.",
    hybrid_notice: "ℹ️ Hybrid Response: Only limited live data was available from data.gov.in, so this answer combines it with general knowledge.",
    live_data_heading: "📊 Based on available live data:",
    general_heading: "📚 From general knowledge:",
    explanation_unavailable: "Data was retrieved from data.gov.in, but an explanation is unavailable right now.",
    service_unavailable: "The answer service is temporarily unavailable. Please try again later or consult the sources listed below.",
    records_label: "records",
    sample_label: "Sample",
};

const HI: Texts = Texts {
    fallback_disclaimer: "⚠️ नोट: data.gov.in से लाइव डेटा वर्तमान में उपलब्ध नहीं है। निम्नलिखित उत्तर सामान्य ज्ञान पर आधारित है, लाइव डेटा पर नहीं।",
    hybrid_notice: "ℹ️ हाइब्रिड प्रतिक्रिया: data.gov.in से सीमित लाइव डेटा उपलब्ध था, इसलिए यह उत्तर उसे सामान्य ज्ञान के साथ जोड़ता है।",
    live_data_heading: "📊 उपलब्ध लाइव डेटा के आधार पर:",
    general_heading: "📚 सामान्य ज्ञान से:",
    explanation_unavailable: "data.gov.in से डेटा प्राप्त हुआ, लेकिन अभी इसकी व्याख्या उपलब्ध नहीं है।",
    service_unavailable: "उत्तर सेवा अस्थायी रूप से उपलब्ध नहीं है। कृपया बाद में पुनः प्रयास करें या नीचे दिए गए स्रोत देखें।",
    records_label: "रिकॉर्ड",
    sample_label: "नमूना",
};

impl Texts {
    pub fn for_language(language: Language) -> &'static Texts {
        match language {
            Language::En => &EN,
            Language::Hi => &HI,
        }
    }
}
