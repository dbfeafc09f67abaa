use anyhow::Result;
use applyportal_core::Portal;

pub async fn pay(portal: &Portal, callback_url: Option<String>) -> Result<()> {
    let init = portal.pay(callback_url).await?;
    println!("Payment reference: {}", init.reference);
    if let Some(amount) = init.amount {
        println!("Amount: {:.2} {}", amount, init.currency.as_deref().unwrap_or_default());
    }
    println!("Complete the payment at:\n  {}", init.authorization_url);
    println!("Then run: applyportal verify-payment");
    Ok(())
}

pub async fn verify(portal: &Portal, reference: Option<String>) -> Result<()> {
    let verification = portal.verify_payment(reference.as_deref()).await?;
    println!("Payment {}: {}", verification.reference, verification.status);
    Ok(())
}

pub async fn submit(portal: &Portal) -> Result<()> {
    let receipt = portal.submit().await?;
    match &receipt.submitted_at {
        Some(at) => println!("Application {} on {}", receipt.status, applyportal_core::utils::format_date(at)),
        None => println!("Application {}", receipt.status),
    }
    Ok(())
}
