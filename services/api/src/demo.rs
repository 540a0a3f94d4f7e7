use crate::infra::memory_board;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use clap::Args;
use jobsy::board::accounts::{Argon2Hasher, CompanyUpdate, IdentityId, RegistrationForm};
use jobsy::board::applications::{ApplicantInput, NewApplication};
use jobsy::board::clock::FixedClock;
use jobsy::board::listings::{JobListing, ListingDraft};
use jobsy::board::memory::MemoryStore;
use jobsy::board::storage::Upload;
use jobsy::board::JobBoard;
use jobsy::config::{AdminBootstrap, BoardSettings, StorageSettings};
use jobsy::error::AppError;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Day the demo clock starts on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Print the final account, listing and application payloads as JSON.
    #[arg(long)]
    pub(crate) json: bool,
    /// Skip the application and CV access portion of the demo.
    #[arg(long)]
    pub(crate) skip_applications: bool,
}

struct Demo {
    board: JobBoard<MemoryStore>,
    clock: Arc<FixedClock>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start,
        json,
        skip_applications,
    } = args;

    let start = start.unwrap_or_else(|| Utc::now().date_naive());
    let opening = start
        .and_hms_opt(9, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now);
    let clock = Arc::new(FixedClock::new(opening));
    let demo = Demo {
        board: memory_board(
            BoardSettings::default(),
            StorageSettings::default(),
            clock.clone(),
            Arc::new(Argon2Hasher),
        ),
        clock,
    };

    let admin = demo
        .board
        .accounts
        .bootstrap_admin(&AdminBootstrap {
            username: "admin".to_string(),
            email: "admin@jobsy.local".to_string(),
            password: Some("demo-admin".to_string()),
        })?
        .ok_or(AppError::Startup("demo administrator was not created"))?;
    demo.board.applications.seed_rejection_reasons()?;

    println!("Job board demo starting {start}");
    let employer = promote_candidate(&demo)?;
    let listing = moderate_listing(&demo, admin, employer)?;

    if !skip_applications {
        apply_and_read_cv(&demo, admin, employer, &listing)?;
    }

    if json {
        let account = demo.board.accounts.account(employer)?;
        let listings = demo.board.listings.admin_listings(
            admin,
            jobsy::board::repository::RowScope::IncludeDeleted,
        )?;
        match serde_json::to_string_pretty(&serde_json::json!({
            "employer": account,
            "listings": listings,
        })) {
            Ok(payload) => println!("\n{payload}"),
            Err(err) => println!("\nJSON payload unavailable: {err}"),
        }
    }

    Ok(())
}

fn register(demo: &Demo, email: &str, name: &str) -> Result<IdentityId, AppError> {
    let view = demo.board.accounts.register(RegistrationForm {
        email: email.to_string(),
        display_name: name.to_string(),
        password: "demo-password".to_string(),
        account_type: None,
    })?;
    Ok(view.identity.id)
}

fn promote_candidate(demo: &Demo) -> Result<IdentityId, AppError> {
    println!("\nRole change with employer cascade");
    let ana = register(demo, "ana@acme.test", "Ana")?;
    let before = demo.board.accounts.account(ana)?;
    println!(
        "- Registered {} as {} (employer record: {})",
        before.identity.email,
        before.profile.role,
        if before.employer.is_some() { "yes" } else { "none" }
    );

    let after = demo.board.accounts.set_role(ana, "employer")?;
    println!(
        "- Promoted to {}; employer record created: {}",
        after.profile.role,
        after.employer.is_some()
    );
    let company = demo.board.accounts.update_company(
        ana,
        CompanyUpdate {
            company_name: Some("Acme Robotics".to_string()),
            company_website: Some("https://acme.test".to_string()),
            ..CompanyUpdate::default()
        },
    )?;
    println!(
        "  Company profile: {} <{}>",
        company.company_name, company.company_website
    );
    Ok(ana)
}

fn moderate_listing(
    demo: &Demo,
    admin: IdentityId,
    employer: IdentityId,
) -> Result<JobListing, AppError> {
    println!("\nListing moderation and expiry");
    let draft = ListingDraft {
        title: "Robotics Engineer".to_string(),
        description: "Build and test warehouse robots.".to_string(),
        category: "Engineering".to_string(),
        location: "Tallinn".to_string(),
        salary_min: Some(3000),
        salary_max: Some(4500),
        ..ListingDraft::default()
    };
    let listing = demo.board.listings.submit(employer, draft.clone())?;
    println!(
        "- Submitted '{}' -> {} (live: {})",
        listing.title,
        listing.status.label(),
        demo.board.listings.is_live(listing.id)?
    );

    let approved = demo.board.listings.approve(admin, listing.id)?;
    if let Some(expires_at) = approved.expires_at {
        println!("- Approved; expires {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }

    demo.clock.advance(Duration::days(10));
    let edited = demo.board.listings.edit(
        employer,
        listing.id,
        ListingDraft {
            title: "Senior Robotics Engineer".to_string(),
            ..draft
        },
    )?;
    println!(
        "- Edited after 10 days -> {} (live: {})",
        edited.status.label(),
        demo.board.listings.is_live(listing.id)?
    );

    let reapproved = demo.board.listings.approve(admin, listing.id)?;
    println!(
        "- Re-approved; expiry unchanged: {}",
        reapproved.expires_at == approved.expires_at
    );
    Ok(reapproved)
}

fn apply_and_read_cv(
    demo: &Demo,
    admin: IdentityId,
    employer: IdentityId,
    listing: &JobListing,
) -> Result<(), AppError> {
    println!("\nApplications, snapshots and CV access");
    let cy = register(demo, "cy@mail.test", "Cy")?;
    demo.board
        .cvs
        .upload_cv(cy, Upload::new("cy-cv.pdf", b"%PDF-1.7 demo".to_vec()))?;

    match demo.board.cvs.access_cv(employer, cy) {
        Ok(_) => println!("- Employer read the CV before any application (unexpected)"),
        Err(err) => println!("- Before applying, employer CV request: {err}"),
    }

    let resume = demo
        .board
        .applications
        .upload_resume(Upload::new("cy-resume.pdf", b"%PDF-1.7 resume".to_vec()))?;
    let application = demo.board.applications.apply(NewApplication {
        listing: Some(listing.id),
        job_title: None,
        job_company: None,
        applicant: ApplicantInput::account(cy),
        cover_letter: "I have built robots for six years.".to_string(),
        resume,
    })?;
    println!(
        "- Application {} snapshots '{}' at {}",
        application.id, application.job_title, application.job_company
    );

    let access = demo.board.cvs.access_cv(employer, cy)?;
    println!("- After applying, employer CV link: {}", access.url());
    let resume = demo
        .board
        .applications
        .application_resume(employer, application.id)?;
    println!("  Resume link for the employer: {}", resume.url);

    demo.board.listings.hard_delete(admin, listing.id)?;
    let mine = demo.board.applications.my_applications(cy)?;
    for view in &mine {
        println!(
            "- After hard delete the candidate still sees '{}' at {}",
            view.job_title, view.job_company
        );
    }
    match demo.board.cvs.access_cv(employer, cy) {
        Ok(_) => println!("- Employer CV access survived the hard delete (unexpected)"),
        Err(err) => println!("- Employer CV request after hard delete: {err}"),
    }
    Ok(())
}
