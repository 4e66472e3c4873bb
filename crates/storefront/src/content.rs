//! Static copy for the landing page.
//!
//! Everything on the page except prices is fixed text. Prices and installment
//! terms come from [`Package::for_type`] so the cards always match what the
//! payment link charges.

use only_choice_core::{Package, PackageType};

/// A button that opens the OTP modal for a package.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutAction {
    pub label: &'static str,
    pub package_type: PackageType,
}

impl CheckoutAction {
    const fn new(label: &'static str, package_type: PackageType) -> Self {
        Self {
            label,
            package_type,
        }
    }
}

#[derive(Debug)]
pub struct Hero {
    pub greeting: &'static str,
    pub revenue_crore: u8,
    pub years: u8,
    pub tagline: &'static str,
    pub cta: CheckoutAction,
    pub trust_line: &'static str,
}

/// Cloudinary player embed with the locked module teaser list.
#[derive(Debug)]
pub struct Trailer {
    pub embed_url: &'static str,
    pub now_playing: &'static str,
    pub locked_modules: &'static [LockedModule],
}

#[derive(Debug)]
pub struct LockedModule {
    pub number: u8,
    pub title: &'static str,
}

/// One tab of the "Who is this for" block.
#[derive(Debug)]
pub struct Audience {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct CurriculumSection {
    pub title: &'static str,
    pub items: &'static [&'static str],
    /// The section holds a note rather than lessons.
    pub is_note: bool,
}

impl CurriculumSection {
    /// "1 lesson", "5 lessons".
    #[must_use]
    pub fn lesson_count(&self) -> String {
        match self.items.len() {
            1 => "1 lesson".to_owned(),
            n => format!("{n} lessons"),
        }
    }

    #[must_use]
    pub const fn badge(&self) -> &'static str {
        if self.is_note { "NOTE" } else { "LESSON" }
    }
}

/// A written quote or a video.
#[derive(Debug)]
pub struct Testimonial {
    pub quote: Option<&'static str>,
    pub video_url: Option<&'static str>,
    pub author: &'static str,
    pub role: &'static str,
}

#[derive(Debug)]
pub struct Faq {
    pub question: &'static str,
    pub answer: &'static str,
}

#[derive(Debug)]
pub struct SocialLink {
    pub label: &'static str,
    pub url: &'static str,
}

/// All fixed landing copy.
#[derive(Debug)]
pub struct Landing {
    pub presenter: &'static str,
    pub hero: Hero,
    pub trailer: Trailer,
    pub audiences: &'static [Audience],
    pub curriculum_heading: &'static str,
    pub curriculum_intro: &'static str,
    pub curriculum_cta: CheckoutAction,
    pub curriculum: &'static [CurriculumSection],
    pub testimonial_heading: &'static str,
    pub testimonial_intro: &'static str,
    pub testimonials: &'static [Testimonial],
    pub faqs: &'static [Faq],
    pub contact_email: &'static str,
    pub closing_pitch: &'static str,
    pub closing_actions: &'static [CheckoutAction],
    pub social: &'static [SocialLink],
    pub powered_by: SocialLink,
}

pub static LANDING: Landing = Landing {
    presenter: "Agnel John D",
    hero: Hero {
        greeting: "Hello!",
        revenue_crore: 10,
        years: 3,
        tagline: "Learn how to position your course as the only choice and scale your \
                  education business.",
        cta: CheckoutAction::new("Enroll Now", PackageType::Regular),
        trust_line: "Trusted by Leaders",
    },
    trailer: Trailer {
        embed_url: "https://player.cloudinary.com/embed/?cloud_name=dnbjncck1&public_id=TrailerAgnelCourse_tres9d",
        now_playing: "1.1. The Growth Laws of My EdTech - My Own Story",
        locked_modules: &[
            LockedModule {
                number: 2,
                title: "Relevance Blueprint to Become Only Choice",
            },
            LockedModule {
                number: 3,
                title: "One Step Closer Framework - 2x Conversion",
            },
            LockedModule {
                number: 4,
                title: "Science of Urgency",
            },
        ],
    },
    audiences: &[
        Audience {
            title: "Course Creators",
            description: "For creators who have knowledge but struggle with positioning, \
                          consistent enrollments, and converting attention into revenue. Learn \
                          how to structure offers, build trust, and become the obvious choice \
                          in your niche.",
        },
        Audience {
            title: "EdTech Founders",
            description: "For founders already selling courses but facing inconsistent growth, \
                          low conversion rates, or scaling challenges. Build systems, remove \
                          objections, increase enrollments, and create predictable revenue.",
        },
        Audience {
            title: "Education Institutes",
            description: "For academies and training centers looking to strengthen \
                          positioning, improve admissions, and dominate their local or online \
                          market. Turn your institute into a category leader with strong \
                          systems and strategic growth.",
        },
    ],
    curriculum_heading: "Inside the Complete Program",
    curriculum_intro: "Every module is designed to help you move forward with clarity and \
                       confidence.",
    curriculum_cta: CheckoutAction::new("Enroll Now", PackageType::Regular),
    curriculum: &[
        CurriculumSection {
            title: "Section 1: The Growth Laws of Education Business",
            items: &[
                "My Story - How I scaled",
                "Concept of Winning Gap",
                "Content is not for views",
                "Focus on the no's, not the yes's",
                "Building Systems & Departments",
            ],
            is_note: false,
        },
        CurriculumSection {
            title: "Section 2: The Art of Relevance",
            items: &[
                "Power of Direct Relevance",
                "Context - Know their Trigger Moment",
                "Market Gap - What makes you unique?",
                "Objection - Ask this Powerful Question",
                "Activity - How to find Context, Market Gap & Objections",
                "Make it Recurring",
            ],
            is_note: false,
        },
        CurriculumSection {
            title: "Section 3: One Step Closer Framework",
            items: &[
                "One Step Closer Framework Explained",
                "Case Study 1: How a technology training company adopted this",
                "Case Study 2: How it worked for HR Training Company",
            ],
            is_note: false,
        },
        CurriculumSection {
            title: "Section 4: Drop the Risk",
            items: &[
                "Why it is important to tell them it is safe",
                "Steps to make the risk feel safe",
            ],
            is_note: false,
        },
        CurriculumSection {
            title: "Section 5: Urgency & Its Kind",
            items: &[
                "What happens between when they say yes and later say no?",
                "Fake Urgency vs Real Urgency",
                "Is the University Model applicable?",
            ],
            is_note: false,
        },
        CurriculumSection {
            title: "Section 6: Future Updates",
            items: &["This program will evolve with market changes and student feedback. \
                      You'll always get updated strategies that match the current reality."],
            is_note: true,
        },
    ],
    testimonial_heading: "Right strategies and frameworks unlocked the next level of growth.",
    testimonial_intro: "We helped edtech companies grow using our proven frameworks. But since \
                        we work with only a few clients at a time, consulting may not always \
                        fit the budget of early-stage founders. So we created a course and a \
                        book to make growth more accessible.",
    testimonials: &[
        Testimonial {
            quote: None,
            video_url: Some(
                "https://player.cloudinary.com/embed/?cloud_name=dnbjncck1&public_id=HR_Navin_Background_Video_dinwwv&muted=true&loop=true",
            ),
            author: "Navin Kumar",
            role: "Founder & CEO @ HR Learners Hub",
        },
        Testimonial {
            quote: Some("The Session with John and Richa was a true turning point. Their clarity, \
                    the \u{201c}Fix\u{2013}Scale\u{2013}Fix\u{201d} framework, and insights on \
                    growth transformed our approach. In just 3 months, we\u{2019}re on track to \
                    5x our business."),
            video_url: None,
            author: "Savitri & Sivakumar",
            role: "Founders @TRICHY PLUS",
        },
    ],
    faqs: &[
        Faq {
            question: "Who is this program for?",
            answer: "This program is designed for edtech founders and operators who want to \
                     build structured, predictable growth instead of relying on random tactics.",
        },
        Faq {
            question: "Who is this NOT for?",
            answer: "This is not for people looking for shortcuts, hacks, or overnight \
                     success. It's for serious builders who are ready to implement systems.",
        },
        Faq {
            question: "What results can I expect?",
            answer: "You'll gain clarity on positioning and learn how to increase revenue and \
                     drive sustainable growth using proven frameworks.",
        },
        Faq {
            question: "Do I get access immediately after enrolling?",
            answer: "Yes. You'll get instant access to the full program after successful \
                     enrollment.",
        },
        Faq {
            question: "Is this suitable for early-stage founders?",
            answer: "Yes. It's especially helpful if you're building from scratch or trying to \
                     move from unstable growth to structured scale.",
        },
        Faq {
            question: "Will I get future updates?",
            answer: "Yes. As the framework evolves, updates will be added so you stay aligned \
                     with current growth strategies.",
        },
        Faq {
            question: "Do you provide 1-on-1 consulting?",
            answer: "We limit consulting to a few companies at a time. This course is our way \
                     of making the same thinking and frameworks accessible to more founders.",
        },
    ],
    contact_email: "agnel@agneljohn.in",
    closing_pitch: "Join course creators who are using a clear, repeatable system to grow \
                    their education business with confidence",
    closing_actions: &[
        CheckoutAction::new("Enroll Now", PackageType::Regular),
        CheckoutAction::new("Explore Prebook", PackageType::Demo),
    ],
    social: &[
        SocialLink {
            label: "Instagram",
            url: "https://www.instagram.com/agneljohnd",
        },
        SocialLink {
            label: "X",
            url: "https://x.com/theagneljohn",
        },
        SocialLink {
            label: "LinkedIn",
            url: "https://www.linkedin.com/in/theagneljohn/",
        },
        SocialLink {
            label: "Newsletter",
            url: "https://www.thewinninggap.com",
        },
    ],
    powered_by: SocialLink {
        label: "LectureHead",
        url: "https://lecturehead.com",
    },
};

/// A pricing card, with amounts taken from the package catalogue.
#[derive(Debug, Clone)]
pub struct PricingCard {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub price: String,
    pub note: String,
    pub features: &'static [&'static str],
    pub actions: Vec<CheckoutAction>,
    pub featured: bool,
}

/// The Regular and Demo cards.
#[must_use]
pub fn pricing_cards() -> Vec<PricingCard> {
    let regular = Package::for_type(PackageType::Regular);
    let demo = Package::for_type(PackageType::Demo);

    let installment_note = regular.installment.map_or_else(String::new, |plan| {
        format!(
            "You can also pay in {} easy installments of {}.",
            plan.count,
            plan.price.display()
        )
    });

    vec![
        PricingCard {
            title: "Full Access",
            subtitle: "One-time payment",
            price: format!("{}/-", regular.price.display()),
            note: installment_note,
            features: &[
                "Full Course Access",
                "Only Choice Book \u{2013} Door Delivery",
                "Community Access",
                "Future Course Updates",
                "Schedule 1:1 Call with Agnel John (45 min)",
            ],
            // Installments are arranged on the payment page of the full plan.
            actions: vec![
                CheckoutAction::new("Get Full access", PackageType::Regular),
                CheckoutAction::new("Pay Installment", PackageType::Regular),
            ],
            featured: true,
        },
        PricingCard {
            title: "Pre-Enrollment Access",
            subtitle: "Try before you commit. 7 Days Refund Policy",
            price: format!("{}/-", demo.price.display()),
            note: String::new(),
            features: &[
                "Module 1 (4 Lessons) Access",
                "Get 1st Chapter of Only Choice Book",
                "Upgrade anytime",
            ],
            actions: vec![CheckoutAction::new("PreBook & Explore", PackageType::Demo)],
            featured: false,
        },
    ]
}
