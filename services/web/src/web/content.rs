//! services/web/src/web/content.rs
//!
//! Static marketing copy for the landing page.

use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Item {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Testimonial {
    pub content: &'static str,
    pub author: &'static str,
    pub role: &'static str,
    pub rating: u8,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Faq {
    pub question: &'static str,
    pub answer: &'static str,
}

pub const FEATURES: [Item; 4] = [
    Item {
        name: "Content Security",
        description: "Protect your data with strong encryption and simple access controls.",
    },
    Item {
        name: "Easy Payments",
        description: "Pay with credit cards, PayPal, or crypto, all with low transaction fees.",
    },
    Item {
        name: "Access Control",
        description: "Set time or view limits to control access to your premium content.",
    },
    Item {
        name: "Data Privacy",
        description: "Secure your content with encryption and easy access management.",
    },
];

pub const STEPS: [Item; 4] = [
    Item {
        name: "Upload Content",
        description: "Easily upload your best images and videos to sell online.",
    },
    Item {
        name: "Set Price & Rules",
        description: "Set your own price and control how content is accessed securely.",
    },
    Item {
        name: "Share Link",
        description: "Share your unique PayPeek link with your audience anywhere.",
    },
    Item {
        name: "Get Paid",
        description: "Get paid instantly when users unlock and view your content.",
    },
];

pub const TESTIMONIALS: [Testimonial; 3] = [
    Testimonial {
        content: "PayPeek transformed my business. I've increased my revenue by 300% since I started selling my photography collections through their platform.",
        author: "Sarah Johnson",
        role: "Photographer",
        rating: 5,
    },
    Testimonial {
        content: "The payment system is seamless. My clients can easily purchase access to my design portfolios, and I get paid instantly.",
        author: "Michael Chen",
        role: "Graphic Designer",
        rating: 5,
    },
    Testimonial {
        content: "Setting up my paywalled content took minutes, not days. I love how I can set different access options for different collections.",
        author: "Emma Rodriguez",
        role: "Digital Artist",
        rating: 4,
    },
];

pub const FAQS: [Faq; 8] = [
    Faq {
        question: "How does PayPeek protect my content?",
        answer: "PayPeek uses enterprise-grade encryption and secure access controls to protect your content. Our paywall technology prevents unauthorized access, downloads, and sharing while providing a seamless experience for your paying customers.",
    },
    Faq {
        question: "What payment methods can my customers use?",
        answer: "Customers can pay using credit/debit cards, PayPal, Apple Pay, Google Pay, and various cryptocurrencies. We handle all payment processing, security, and compliance so you can focus on creating content.",
    },
    Faq {
        question: "How quickly will I receive my earnings?",
        answer: "Earnings are processed on a rolling basis with payouts every 7 days. Once processed, funds typically arrive in your account within 1-3 business days depending on your bank.",
    },
    Faq {
        question: "What types of content can I sell on PayPeek?",
        answer: "PayPeek supports a wide range of digital content including images, videos, PDFs, audio files, e-books, and more. If you have a specific content type not listed here, please contact our support team to discuss compatibility.",
    },
    Faq {
        question: "How much does PayPeek charge per transaction?",
        answer: "We charge a small processing fee on transactions (2.9% + $0.30 for standard payment methods). This fee covers our platform services, allowing you to keep more of what you earn.",
    },
    Faq {
        question: "Can I customize the payment page my customers see?",
        answer: "Yes, you can customize the payment page with your branding, including logo, colors, and custom messages to maintain a consistent experience for your audience.",
    },
    Faq {
        question: "What access options can I set for my content?",
        answer: "You can set time-based access (content expires after a set period), view-based access (limited number of views), or permanent access (one-time payment for unlimited access).",
    },
    Faq {
        question: "Is there a limit to how much content I can upload?",
        answer: "There are no strict limits on the amount of content you can upload, though there are file size limits for individual files (up to 2GB per file). For extremely large collections, contact our support team for custom solutions.",
    },
];
